//! Interfaces of the external data collaborators.

use std::fmt;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{AnnualEnergy, CapacitySnapshot, IrradianceSeries};

/// Administrative area the register and production datasets are filtered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// INSEE commune code.
    Commune(String),
    /// INSEE region code.
    Region(String),
}

impl Scope {
    pub fn code(&self) -> &str {
        match self {
            Scope::Commune(code) | Scope::Region(code) => code,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Commune(code) => write!(f, "commune {code}"),
            Scope::Region(code) => write!(f, "region {code}"),
        }
    }
}

/// Where and how the panels face.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteParameters {
    pub latitude: f64,
    pub longitude: f64,
    pub tilt_deg: f64,
    /// 0 = south, -90 = east, 90 = west.
    pub azimuth_deg: f64,
    pub timezone: String,
}

/// National installation register and regional grid-operator production.
#[async_trait]
pub trait RegisterSource: Send + Sync {
    /// Capacity at the end of `year` and production over `year` for a commune.
    /// Fails with an absent error ([`SourceError::is_absent`]) when the
    /// register has nothing for that commune and year.
    async fn capacity_and_energy(
        &self,
        commune_code: &str,
        year: i32,
    ) -> Result<(CapacitySnapshot, AnnualEnergy), SourceError>;

    /// Total installed PV capacity (kW); `None` selects the latest snapshot.
    async fn capacity_total(&self, scope: &Scope, year: Option<i32>) -> Result<f64, SourceError>;

    /// Regional PV production over `year` (MWh).
    async fn regional_annual_production_mwh(
        &self,
        region_code: &str,
        year: i32,
    ) -> Result<f64, SourceError>;
}

/// Hourly tilted irradiance for a site.
#[async_trait]
pub trait IrradianceSource: Send + Sync {
    async fn hourly_irradiance(
        &self,
        year: i32,
        site: &SiteParameters,
    ) -> Result<IrradianceSeries, SourceError>;
}

/// Trusted annual production from the distribution operator.
#[async_trait]
pub trait TrustedProductionSource: Send + Sync {
    /// Production over `year` (MWh).
    async fn annual_production_mwh(&self, scope: &Scope, year: i32) -> Result<f64, SourceError>;
}
