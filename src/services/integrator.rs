//! Irradiance integration.
//!
//! A 1 kWp array produces 1 kW under the 1000 W/m² reference irradiance, so a
//! sample `G` (W/m²) held for one step contributes `G / 1000 * step_hours`
//! kWh per kWp.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CalibrationError;
use crate::models::{IrradianceSeries, TimeAxis};
use crate::services::growth_model::GrowthModel;

/// Reference irradiance of the kWp rating (W/m²).
pub const REFERENCE_IRRADIANCE_W_M2: f64 = 1000.0;

/// Annual irradiance "H" in kWh per kWp: plain sum of present samples.
pub fn annual_irradiance_per_kwp(series: &IrradianceSeries) -> Result<f64, CalibrationError> {
    let mut usable = 0usize;
    let mut total = 0.0;
    for (_, g) in series.samples() {
        usable += 1;
        total += g / REFERENCE_IRRADIANCE_W_M2 * series.step_hours;
    }
    if usable == 0 {
        return Err(CalibrationError::EmptySeries { len: series.len() });
    }
    Ok(total)
}

/// Integrates a capacity trajectory against an irradiance series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integrator {
    time_axis: TimeAxis,
}

impl Integrator {
    pub fn new(time_axis: TimeAxis) -> Self {
        Self { time_axis }
    }

    pub fn time_axis(&self) -> TimeAxis {
        self.time_axis
    }

    /// Expected energy (kWh) of the fleet described by `model`:
    /// `sum capacity_at(tau_i) * G_i / 1000 * step` over present samples.
    pub fn integrate_weighted(
        &self,
        series: &IrradianceSeries,
        model: &GrowthModel,
    ) -> Result<f64, CalibrationError> {
        let usable = series.usable_samples();
        if usable == 0 {
            return Err(CalibrationError::EmptySeries { len: series.len() });
        }

        let mut integral = 0.0;
        match self.time_axis {
            TimeAxis::Position => {
                let n = series.len();
                for (i, g) in series.samples() {
                    integral += model.capacity_at(position_tau(i, n)) * per_kwp(g, series);
                }
            }
            TimeAxis::Timestamp => {
                let timestamps = series.timestamps.as_deref().unwrap_or(&[]);
                if timestamps.len() != series.len() {
                    return Err(CalibrationError::MissingTimestamps {
                        expected: series.len(),
                        actual: timestamps.len(),
                    });
                }
                let axis = CalendarAxis::new(series.year);
                for (i, g) in series.samples() {
                    integral += model.capacity_at(axis.tau(timestamps[i])) * per_kwp(g, series);
                }
            }
        }

        if !(integral > 0.0) {
            return Err(CalibrationError::NonPositiveIntegral {
                integral,
                samples: usable,
            });
        }
        Ok(integral)
    }
}

#[inline]
fn per_kwp(g: f64, series: &IrradianceSeries) -> f64 {
    g / REFERENCE_IRRADIANCE_W_M2 * series.step_hours
}

/// `i / (n - 1)`; a single sample sits at the start of the year.
#[inline]
pub fn position_tau(i: usize, n: usize) -> f64 {
    if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 }
}

/// Maps timestamps to `[0, 1]` between January 1st 00:00 and December 31st
/// 23:00, the first and last hourly slots of the year.
struct CalendarAxis {
    start: NaiveDateTime,
    span_s: f64,
}

impl CalendarAxis {
    fn new(year: i32) -> Self {
        let start = year_start(year);
        let last_hour = year_start(year + 1) - chrono::Duration::hours(1);
        Self {
            start,
            span_s: (last_hour - start).num_seconds() as f64,
        }
    }

    fn tau(&self, t: NaiveDateTime) -> f64 {
        ((t - self.start).num_seconds() as f64 / self.span_s).clamp(0.0, 1.0)
    }
}

fn year_start(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
}
