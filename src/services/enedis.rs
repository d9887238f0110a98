//! Enedis open data: annual production per generation type at commune level.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::SourceError;
use crate::services::opendatasoft::{Query, fetch_records, field_f64, single_row};
use crate::services::sources::{Scope, TrustedProductionSource};

pub const PRODUCTION_DATASET: &str = "production-electrique-par-filiere-a-la-maille-commune";

const COMMUNE_FIELD: &str = "code_commune";
const REGION_FIELD: &str = "code_region";
const YEAR_FIELD: &str = "annee";
const PV_ENERGY_FIELD: &str = "energie_produite_annuelle_photovoltaique_enedis_mwh";

#[derive(Debug, Clone)]
pub struct EnedisClient {
    client: Client,
    base_url: String,
}

impl EnedisClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TrustedProductionSource for EnedisClient {
    async fn annual_production_mwh(&self, scope: &Scope, year: i32) -> Result<f64, SourceError> {
        let field = match scope {
            Scope::Commune(_) => COMMUNE_FIELD,
            Scope::Region(_) => REGION_FIELD,
        };
        let query = Query {
            filter: format!("{YEAR_FIELD}=date'{year}' AND {field}='{}'", scope.code()),
            select: format!("sum({PV_ENERGY_FIELD}) as energy_mwh"),
            group_by: field.to_string(),
            limit: 2,
        };

        let rows = fetch_records(&self.client, &self.base_url, PRODUCTION_DATASET, &query).await?;
        if rows.is_empty() {
            return Err(SourceError::NoRecord {
                dataset: PRODUCTION_DATASET.to_string(),
                filter: query.filter,
            });
        }
        let row = single_row(rows, PRODUCTION_DATASET)?;
        let energy_mwh = field_f64(&row, PRODUCTION_DATASET, "energy_mwh")?.unwrap_or(0.0);
        debug!(%scope, year, energy_mwh, "enedis production");
        Ok(energy_mwh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_commune_production() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{PRODUCTION_DATASET}/records")))
            .and(query_param("where", "annee=date'2023' AND code_commune='92002'"))
            .and(query_param(
                "select",
                "sum(energie_produite_annuelle_photovoltaique_enedis_mwh) as energy_mwh",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"code_commune": "92002", "energy_mwh": 1432.7}]
            })))
            .mount(&server)
            .await;

        let enedis = EnedisClient::new(Client::new(), server.uri());
        let mwh = enedis
            .annual_production_mwh(&Scope::Commune("92002".into()), 2023)
            .await
            .unwrap();
        assert_eq!(mwh, 1432.7);
    }

    #[tokio::test]
    async fn test_missing_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let enedis = EnedisClient::new(Client::new(), server.uri());
        let err = enedis
            .annual_production_mwh(&Scope::Region("11".into()), 2031)
            .await
            .unwrap_err();
        assert!(err.is_absent());
    }
}
