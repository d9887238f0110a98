pub mod calibrator;
pub mod enedis;
pub mod growth_model;
pub mod integrator;
pub mod odre;
pub mod open_meteo;
pub mod opendatasoft;
pub mod pipeline;
pub mod solar_algorithm;
pub mod sources;

use std::time::Duration;

use reqwest::Client;

use crate::error::SourceError;

/// Shared HTTP client for every data source.
pub fn http_client(timeout_s: u64) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_s))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
