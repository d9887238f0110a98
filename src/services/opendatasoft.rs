//! Opendatasoft "explore v2.1" records API, shared by ODRE and Enedis.

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SourceError;
use crate::models::opendata::RecordsResponse;

pub type Row = Map<String, Value>;

/// Aggregating query: `select ... where ... group by ...`.
#[derive(Debug, Clone)]
pub struct Query {
    pub filter: String,
    pub select: String,
    pub group_by: String,
    pub limit: u32,
}

impl Query {
    fn params(&self) -> [(&'static str, String); 4] {
        [
            ("where", self.filter.clone()),
            ("select", self.select.clone()),
            ("group_by", self.group_by.clone()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// `GET {base_url}/{dataset}/records`; a missing dataset is
/// [`SourceError::SnapshotNotFound`].
pub async fn fetch_records(
    client: &Client,
    base_url: &str,
    dataset: &str,
    query: &Query,
) -> Result<Vec<Row>, SourceError> {
    let url = format!("{}/{}/records", base_url.trim_end_matches('/'), dataset);
    debug!(%url, filter = %query.filter, "opendatasoft request");

    let response = client.get(&url).query(&query.params()).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(SourceError::SnapshotNotFound {
            dataset: dataset.to_string(),
        });
    }
    let body: RecordsResponse = response.error_for_status()?.json().await?;
    debug!(dataset, rows = body.results.len(), total = ?body.total_count, "opendatasoft response");
    Ok(body.results)
}

/// The only row of an aggregate grouped on a single key.
pub fn single_row(rows: Vec<Row>, dataset: &str) -> Result<Row, SourceError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Ok(row),
        _ => Err(SourceError::UnexpectedRows {
            dataset: dataset.to_string(),
            rows: count,
        }),
    }
}

/// Numeric aggregate `field`; `null` (sum over no records) reads as `None`.
pub fn field_f64(row: &Row, dataset: &str, field: &str) -> Result<Option<f64>, SourceError> {
    let missing = || SourceError::MissingField {
        dataset: dataset.to_string(),
        field: field.to_string(),
    };
    match row.get(field) {
        None => Err(missing()),
        Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| missing()),
        Some(_) => Err(missing()),
    }
}
