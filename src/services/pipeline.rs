//! Runs both calibration paths against the data collaborators.

use std::collections::BTreeMap;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::error::{CalibrationError, RatioError, SourceError};
use crate::models::{
    AnnualEnergy, CapacitySnapshot, IrradianceSeries, RatioCalibration, RatioInputs,
    TrajectoryCalibration, YearInputs, YearOutcome,
};
use crate::services::calibrator::{Calibrator, calibrate_ratio};
use crate::services::sources::{
    IrradianceSource, RegisterSource, Scope, SiteParameters, TrustedProductionSource,
};

/// Register snapshots keyed by year; absent years are simply not present.
pub type Snapshots = BTreeMap<i32, (CapacitySnapshot, AnnualEnergy)>;

/// Fetches the register snapshot of every year in `[start_year, end_year]`
/// concurrently. Years the register has nothing for are left out; any other
/// failure aborts.
pub async fn fetch_snapshots<R>(
    register: &R,
    commune_code: &str,
    start_year: i32,
    end_year: i32,
) -> Result<Snapshots, SourceError>
where
    R: RegisterSource + ?Sized,
{
    let requests = (start_year..=end_year).map(|year| async move {
        (year, register.capacity_and_energy(commune_code, year).await)
    });

    let mut snapshots = Snapshots::new();
    for (year, result) in join_all(requests).await {
        match result {
            Ok((cap, energy)) => {
                info!(
                    year,
                    capacity_kw = cap.capacity_kw,
                    energy_mwh = energy.energy_kwh / 1000.0,
                    "register snapshot"
                );
                snapshots.insert(year, (cap, energy));
            }
            Err(e) if e.is_absent() => warn!(year, error = %e, "no register snapshot"),
            Err(e) => return Err(e),
        }
    }
    Ok(snapshots)
}

/// Calibration inputs for `year` from the snapshots; absent values read as 0
/// so the calibrator reports them as missing data.
fn year_inputs(snapshots: &Snapshots, year: i32, irradiance: IrradianceSeries) -> YearInputs {
    let capacity = |y| snapshots.get(&y).map_or(0.0, |(c, _)| c.capacity_kw);
    YearInputs {
        year,
        c_prev_kw: capacity(year - 1),
        c_curr_kw: capacity(year),
        energy_kwh: snapshots.get(&year).map_or(0.0, |(_, e)| e.energy_kwh),
        irradiance,
    }
}

/// Trajectory calibration of every year in `(start_year, end_year]`.
///
/// A failed irradiance fetch is recorded as that year's outcome; only a
/// register failure other than an absent snapshot aborts the run.
pub async fn run_trajectory<R, I>(
    register: &R,
    irradiance: &I,
    calibrator: &Calibrator,
    commune_code: &str,
    site: &SiteParameters,
    start_year: i32,
    end_year: i32,
) -> Result<TrajectoryCalibration, SourceError>
where
    R: RegisterSource + ?Sized,
    I: IrradianceSource + ?Sized,
{
    let snapshots = fetch_snapshots(register, commune_code, start_year, end_year).await?;
    let years: Vec<i32> = ((start_year + 1)..=end_year).collect();

    // Irradiance is only worth fetching for years with usable register data.
    let requests = years.iter().map(|&year| {
        let inputs = year_inputs(&snapshots, year, IrradianceSeries::hourly(year, Vec::new()));
        let wanted = inputs.c_prev_kw > 0.0 && inputs.c_curr_kw > 0.0 && inputs.energy_kwh > 0.0;
        async move {
            if !wanted {
                return (year, Ok(inputs));
            }
            match irradiance.hourly_irradiance(year, site).await {
                Ok(series) => (year, Ok(YearInputs { irradiance: series, ..inputs })),
                // Recorded as an empty series, so the year is skipped.
                Err(SourceError::EmptyIrradiance { .. }) => {
                    warn!(year, "provider returned no irradiance");
                    (year, Ok(inputs))
                }
                Err(e) => (
                    year,
                    Err(CalibrationError::IrradianceUnavailable {
                        year,
                        reason: e.to_string(),
                    }),
                ),
            }
        }
    });

    let outcomes = join_all(requests)
        .await
        .into_iter()
        .map(|(year, fetched)| match fetched {
            Ok(inputs) => calibrator.calibrate_outcome(&inputs),
            Err(e) => {
                warn!(year, error = %e, "year skipped");
                YearOutcome { year, result: Err(e) }
            }
        })
        .collect();

    Ok(calibrator.reduce(outcomes))
}

/// Result of the ratio path, with sanity figures for the report.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioReport {
    pub inputs: RatioInputs,
    pub calibration: RatioCalibration,
    /// Regional production per installed kW (MWh/kW/year), expected near 1.
    pub implied_region_yield: f64,
    /// Capacity ratio from the latest register snapshot, if available.
    pub latest_r_cap: Option<f64>,
}

/// Ratio calibration at `year` for `locality` within `region`.
pub async fn run_ratio<R, T>(
    register: &R,
    trusted: &T,
    locality: &Scope,
    region: &Scope,
    year: i32,
) -> Result<RatioReport, RatioError>
where
    R: RegisterSource + ?Sized,
    T: TrustedProductionSource + ?Sized,
{
    let (capacity_locality_kw, capacity_region_kw, region_energy_mwh, locality_energy_mwh) = tokio::try_join!(
        register.capacity_total(locality, Some(year)),
        register.capacity_total(region, Some(year)),
        register.regional_annual_production_mwh(region.code(), year),
        trusted.annual_production_mwh(locality, year),
    )?;
    info!(
        year,
        capacity_locality_kw, capacity_region_kw, region_energy_mwh, locality_energy_mwh, "ratio inputs"
    );

    let inputs = RatioInputs {
        year,
        capacity_locality_kw,
        capacity_region_kw,
        region_energy_mwh,
        locality_energy_mwh,
    };
    let calibration = calibrate_ratio(&inputs)?;

    let latest_r_cap = match tokio::try_join!(
        register.capacity_total(locality, None),
        register.capacity_total(region, None),
    ) {
        Ok((loc, reg)) if reg > 0.0 => Some(loc / reg),
        Ok((_, reg)) => {
            warn!(capacity_region_kw = reg, "latest regional capacity is not positive");
            None
        }
        Err(e) => {
            warn!(error = %e, "latest capacity ratio unavailable");
            None
        }
    };

    Ok(RatioReport {
        inputs,
        calibration,
        implied_region_yield: region_energy_mwh / capacity_region_kw,
        latest_r_cap,
    })
}
