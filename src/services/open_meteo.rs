use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::models::IrradianceSeries;
use crate::models::opendata::ArchiveResponse;
use crate::services::sources::{IrradianceSource, SiteParameters};

/// Open-Meteo satellite radiation archive.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    archive_url: String,
}

impl OpenMeteoClient {
    pub fn new(client: Client, archive_url: impl Into<String>) -> Self {
        Self {
            client,
            archive_url: archive_url.into(),
        }
    }
}

#[async_trait]
impl IrradianceSource for OpenMeteoClient {
    /// Hourly `global_tilted_irradiance` (W/m²) for the whole calendar year.
    async fn hourly_irradiance(
        &self,
        year: i32,
        site: &SiteParameters,
    ) -> Result<IrradianceSeries, SourceError> {
        let params = [
            ("latitude", site.latitude.to_string()),
            ("longitude", site.longitude.to_string()),
            ("hourly", "global_tilted_irradiance".to_string()),
            ("tilt", site.tilt_deg.to_string()),
            ("azimuth", site.azimuth_deg.to_string()),
            ("timeformat", "iso8601".to_string()),
            ("timezone", site.timezone.clone()),
            ("time_resolution", "native".to_string()),
            ("start_date", format!("{year}-01-01")),
            ("end_date", format!("{year}-12-31")),
            ("forecast_hours", "0".to_string()),
        ];
        debug!(url = %self.archive_url, year, "fetching irradiance");

        let resp: ArchiveResponse = self
            .client
            .get(&self.archive_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hourly = resp.hourly.ok_or(SourceError::EmptyIrradiance { year })?;
        if hourly.global_tilted_irradiance.is_empty() {
            return Err(SourceError::EmptyIrradiance { year });
        }

        let series = IrradianceSeries::hourly(year, hourly.global_tilted_irradiance);
        match parse_times(&hourly.time) {
            Some(ts) if ts.len() == series.len() => Ok(series.with_timestamps(ts)),
            _ => {
                warn!(year, times = hourly.time.len(), samples = series.len(), "unusable time axis from Open-Meteo");
                Ok(series)
            }
        }
    }
}

/// Open-Meteo iso8601 local times: `"2023-01-01T00:00"`.
fn parse_times(times: &[String]) -> Option<Vec<NaiveDateTime>> {
    times
        .iter()
        .map(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok())
        .collect()
}
