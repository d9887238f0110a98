use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{GrowthLaw, TimeAxis};
use crate::services::sources::{Scope, SiteParameters};

fn default_offline_mode() -> bool { false }
fn default_timezone() -> String { "Europe/Paris".to_string() }
fn default_tilt_deg() -> f64 { 30.0 }
fn default_laws() -> Vec<GrowthLaw> { GrowthLaw::ALL.to_vec() }
fn default_odre_base_url() -> String {
    "https://odre.opendatasoft.com/api/explore/v2.1/catalog/datasets".to_string()
}
fn default_enedis_base_url() -> String {
    "https://data.enedis.fr/api/explore/v2.1/catalog/datasets".to_string()
}
fn default_open_meteo_archive_url() -> String {
    "https://satellite-api.open-meteo.com/v1/archive".to_string()
}
fn default_timeout_s() -> u64 { 30 }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub location: LocationConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    pub trajectory: TrajectoryConfig,
    pub ratio: RatioConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Use the synthetic clear-sky irradiance instead of Open-Meteo.
    #[serde(default = "default_offline_mode")]
    pub offline_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub name: String,
    /// INSEE commune code, e.g. "92002".
    pub commune_code: String,
    /// INSEE region code of the enclosing region, e.g. "11".
    pub region_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Panel orientation, Open-Meteo convention (azimuth 0 = south, -90 = east).
#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    #[serde(default = "default_tilt_deg")]
    pub tilt_deg: f64,
    #[serde(default)]
    pub azimuth_deg: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            tilt_deg: default_tilt_deg(),
            azimuth_deg: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrajectoryConfig {
    /// First register snapshot; the first calibrated year is the one after.
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_laws")]
    pub laws: Vec<GrowthLaw>,
    #[serde(default)]
    pub time_axis: TimeAxis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatioConfig {
    pub reference_year: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_odre_base_url")]
    pub odre_base_url: String,
    #[serde(default = "default_enedis_base_url")]
    pub enedis_base_url: String,
    #[serde(default = "default_open_meteo_archive_url")]
    pub open_meteo_archive_url: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            odre_base_url: default_odre_base_url(),
            enedis_base_url: default_enedis_base_url(),
            open_meteo_archive_url: default_open_meteo_archive_url(),
            timeout_s: default_timeout_s(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trajectory;
        if t.end_year <= t.start_year {
            return Err(ConfigError::Invalid(format!(
                "trajectory.end_year ({}) must be after start_year ({})",
                t.end_year, t.start_year
            )));
        }
        if t.laws.is_empty() {
            return Err(ConfigError::Invalid("trajectory.laws is empty".to_string()));
        }
        if self.sources.timeout_s == 0 {
            return Err(ConfigError::Invalid("sources.timeout_s must be positive".to_string()));
        }
        Ok(())
    }

    pub fn site(&self) -> SiteParameters {
        SiteParameters {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            tilt_deg: self.panel.tilt_deg,
            azimuth_deg: self.panel.azimuth_deg,
            timezone: self.location.timezone.clone(),
        }
    }

    pub fn commune(&self) -> Scope {
        Scope::Commune(self.location.commune_code.clone())
    }

    pub fn region(&self) -> Scope {
        Scope::Region(self.location.region_code.clone())
    }
}
