//! ODRE open data: national installation register and eco2mix regional
//! production.

use async_trait::async_trait;
use chrono::Datelike;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::models::{AnnualEnergy, CapacitySnapshot};
use crate::services::opendatasoft::{Query, fetch_records, field_f64, single_row};
use crate::services::sources::{RegisterSource, Scope};

pub const REGISTER_DATASET: &str =
    "registre-national-installation-production-stockage-electricite-agrege";
pub const ECO2MIX_DATASET: &str = "eco2mix-regional-cons-def";

// ─── Register fields ─────────────────────────────────────────────────────────
const REGISTER_COMMUNE_FIELD: &str = "codeinseecommune";
const REGISTER_REGION_FIELD: &str = "coderegion";
const REGISTER_GEN_CODE_FIELD: &str = "codefiliere"; // 'SOLAI'
const REGISTER_GEN_FIELD: &str = "filiere"; // 'Solaire'
const REGISTER_TECH_CODE_FIELD: &str = "codetechnologie"; // 'PHOTV'
const REGISTER_CONNECTED_CAP_FIELD: &str = "puismaxrac"; // kW
const REGISTER_INSTALLED_CAP_FIELD: &str = "puismaxinstallee"; // kW
const REGISTER_ENERGY_FIELD_OLD: &str = "energieannuelleinjectee"; // kWh, before 2020
const REGISTER_ENERGY_FIELD: &str = "energieannuelleglissanteinjectee"; // kWh, from 2020

// ─── eco2mix fields ──────────────────────────────────────────────────────────
const ECO2MIX_REGION_FIELD: &str = "code_insee_region";
const ECO2MIX_DATETIME_FIELD: &str = "date_heure";
const ECO2MIX_SOLAR_FIELD: &str = "solaire"; // MW, half-hourly
const ECO2MIX_STEP_HOURS: f64 = 0.5;

/// Register snapshot at December 31st of `year`, or the latest one. The
/// two-digit year suffix is not zero-padded (2005 gives `-31125`).
pub fn register_dataset(year: Option<i32>) -> String {
    match year {
        Some(y) => format!("{REGISTER_DATASET}-3112{}", y.rem_euclid(100)),
        None => REGISTER_DATASET.to_string(),
    }
}

/// The register's annual energy column was renamed in 2020.
fn register_energy_field(year: i32) -> &'static str {
    if year < 2020 { REGISTER_ENERGY_FIELD_OLD } else { REGISTER_ENERGY_FIELD }
}

#[derive(Debug, Clone)]
pub struct OdreClient {
    client: Client,
    base_url: String,
}

impl OdreClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Last year with a published snapshot, probing upward from `from_year`
    /// until the register answers 404.
    pub async fn latest_snapshot_year(&self, from_year: i32) -> Result<Option<i32>, SourceError> {
        let query = Query {
            filter: format!("{REGISTER_GEN_CODE_FIELD} like 'SOLAI'"),
            select: "count(*) as n".to_string(),
            group_by: REGISTER_GEN_CODE_FIELD.to_string(),
            limit: 1,
        };
        let last_possible = chrono::Utc::now().year() + 1;

        let mut latest = None;
        for year in from_year..=last_possible {
            match fetch_records(&self.client, &self.base_url, &register_dataset(Some(year)), &query).await {
                Ok(_) => latest = Some(year),
                Err(SourceError::SnapshotNotFound { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        info!(from_year, ?latest, "latest register snapshot");
        Ok(latest)
    }
}

#[async_trait]
impl RegisterSource for OdreClient {
    async fn capacity_and_energy(
        &self,
        commune_code: &str,
        year: i32,
    ) -> Result<(CapacitySnapshot, AnnualEnergy), SourceError> {
        let dataset = register_dataset(Some(year));
        let query = Query {
            filter: format!(
                "{REGISTER_COMMUNE_FIELD}='{commune_code}' AND {REGISTER_GEN_CODE_FIELD} like 'SOLAI' AND {REGISTER_TECH_CODE_FIELD} like 'PHOTV'"
            ),
            select: format!(
                "sum({REGISTER_CONNECTED_CAP_FIELD}) as cap_kw, sum({}) as e_kwh",
                register_energy_field(year)
            ),
            group_by: REGISTER_COMMUNE_FIELD.to_string(),
            limit: 5,
        };

        let rows = fetch_records(&self.client, &self.base_url, &dataset, &query).await?;
        let Some(row) = rows.first() else {
            return Err(SourceError::NoRecord {
                dataset,
                filter: query.filter,
            });
        };

        let capacity_kw = field_f64(row, &dataset, "cap_kw")?.unwrap_or(0.0);
        let energy_kwh = field_f64(row, &dataset, "e_kwh")?.unwrap_or(0.0);
        debug!(commune_code, year, capacity_kw, energy_kwh, "register snapshot");

        Ok((
            CapacitySnapshot { year, capacity_kw },
            AnnualEnergy { year, energy_kwh },
        ))
    }

    async fn capacity_total(&self, scope: &Scope, year: Option<i32>) -> Result<f64, SourceError> {
        let dataset = register_dataset(year);
        let field = match scope {
            Scope::Commune(_) => REGISTER_COMMUNE_FIELD,
            Scope::Region(_) => REGISTER_REGION_FIELD,
        };
        let query = Query {
            filter: format!("{field}='{}' AND {REGISTER_GEN_FIELD} like 'Solaire'", scope.code()),
            select: format!("sum({REGISTER_INSTALLED_CAP_FIELD}) as p_inst_kw"),
            group_by: field.to_string(),
            limit: 2,
        };

        let rows = fetch_records(&self.client, &self.base_url, &dataset, &query).await?;
        if rows.is_empty() {
            return Err(SourceError::NoRecord {
                dataset,
                filter: query.filter,
            });
        }
        let row = single_row(rows, &dataset)?;
        let capacity_kw = field_f64(&row, &dataset, "p_inst_kw")?.unwrap_or(0.0);
        debug!(%scope, ?year, capacity_kw, "capacity total");
        Ok(capacity_kw)
    }

    async fn regional_annual_production_mwh(
        &self,
        region_code: &str,
        year: i32,
    ) -> Result<f64, SourceError> {
        let query = Query {
            filter: format!(
                "{ECO2MIX_REGION_FIELD}='{region_code}' AND {ECO2MIX_DATETIME_FIELD} >= date'{year}-01-01T00:00:00' AND {ECO2MIX_DATETIME_FIELD} < date'{}-01-01T00:00:00'",
                year + 1
            ),
            select: format!("sum({ECO2MIX_SOLAR_FIELD}) as sum_solar_mw"),
            group_by: ECO2MIX_REGION_FIELD.to_string(),
            limit: 2,
        };

        let rows = fetch_records(&self.client, &self.base_url, ECO2MIX_DATASET, &query).await?;
        let row = single_row(rows, ECO2MIX_DATASET)?;
        let sum_mw = field_f64(&row, ECO2MIX_DATASET, "sum_solar_mw")?.unwrap_or(0.0);
        // MW averaged over half-hour steps -> MWh
        Ok(sum_mw * ECO2MIX_STEP_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn records_path(dataset: &str) -> String {
        format!("/{dataset}/records")
    }

    #[test]
    fn test_register_dataset_names() {
        assert_eq!(
            register_dataset(Some(2023)),
            "registre-national-installation-production-stockage-electricite-agrege-311223"
        );
        assert_eq!(register_dataset(Some(2005)), format!("{REGISTER_DATASET}-31125"));
        assert_eq!(register_dataset(None), REGISTER_DATASET);
    }

    #[test]
    fn test_energy_field_switch() {
        assert_eq!(register_energy_field(2019), "energieannuelleinjectee");
        assert_eq!(register_energy_field(2020), "energieannuelleglissanteinjectee");
    }

    #[tokio::test]
    async fn test_capacity_and_energy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(records_path(&register_dataset(Some(2018)))))
            .and(query_param(
                "select",
                "sum(puismaxrac) as cap_kw, sum(energieannuelleinjectee) as e_kwh",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"codeinseecommune": "92002", "cap_kw": 850.0, "e_kwh": null}]
            })))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        let (cap, energy) = odre.capacity_and_energy("92002", 2018).await.unwrap();
        assert_eq!(cap, CapacitySnapshot { year: 2018, capacity_kw: 850.0 });
        assert_eq!(energy, AnnualEnergy { year: 2018, energy_kwh: 0.0 });
    }

    #[tokio::test]
    async fn test_capacity_and_energy_no_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        let err = odre.capacity_and_energy("92002", 2021).await.unwrap_err();
        assert!(matches!(err, SourceError::NoRecord { .. }));
        assert!(err.is_absent());
    }

    #[tokio::test]
    async fn test_capacity_total_region_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(records_path(REGISTER_DATASET)))
            .and(query_param("where", "coderegion='11' AND filiere like 'Solaire'"))
            .and(query_param("group_by", "coderegion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"coderegion": "11", "p_inst_kw": 912345.5}]
            })))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        let kw = odre.capacity_total(&Scope::Region("11".into()), None).await.unwrap();
        assert_eq!(kw, 912345.5);
    }

    #[tokio::test]
    async fn test_capacity_total_rejects_several_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"p_inst_kw": 1.0}, {"p_inst_kw": 2.0}]
            })))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        let err = odre
            .capacity_total(&Scope::Commune("92002".into()), Some(2023))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::UnexpectedRows { rows: 2, .. }));
    }

    #[tokio::test]
    async fn test_regional_production_half_hourly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(records_path(ECO2MIX_DATASET)))
            .and(query_param(
                "where",
                "code_insee_region='11' AND date_heure >= date'2023-01-01T00:00:00' AND date_heure < date'2024-01-01T00:00:00'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"code_insee_region": "11", "sum_solar_mw": 1_000_000.0}]
            })))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        let mwh = odre.regional_annual_production_mwh("11", 2023).await.unwrap();
        assert_relative_eq!(mwh, 500_000.0);
    }

    #[tokio::test]
    async fn test_latest_snapshot_year_stops_at_404() {
        let server = MockServer::start().await;
        for year in [2022, 2023, 2024] {
            Mock::given(method("GET"))
                .and(path(records_path(&register_dataset(Some(year)))))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let odre = OdreClient::new(Client::new(), server.uri());
        assert_eq!(odre.latest_snapshot_year(2022).await.unwrap(), Some(2024));
        assert_eq!(odre.latest_snapshot_year(2010).await.unwrap(), None);
    }
}
