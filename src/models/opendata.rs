use serde::Deserialize;
use serde_json::{Map, Value};

// ─── Opendatasoft (ODRE, Enedis) wire types ──────────────────────────────────

/// Body of `GET /api/explore/v2.1/catalog/datasets/{dataset}/records`.
/// Row shape depends on the `select` clause, so rows stay untyped.
#[derive(Debug, Deserialize)]
pub struct RecordsResponse {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<Map<String, Value>>,
}

// ─── Open-Meteo archive wire types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub hourly: Option<HourlyData>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyData {
    /// Local times such as `"2023-01-01T00:00"`.
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub global_tilted_irradiance: Vec<Option<f64>>,
}
