use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::CalibrationError;

// ─── Register inputs ─────────────────────────────────────────────────────────

/// Installed capacity of a location at the end of `year`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacitySnapshot {
    pub year: i32,
    pub capacity_kw: f64,
}

/// Trusted production of a location over `year`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualEnergy {
    pub year: i32,
    pub energy_kwh: f64,
}

// ─── Irradiance ──────────────────────────────────────────────────────────────

/// Global tilted irradiance (W/m²) over one calendar year at a fixed step.
///
/// Index 0 is the first sample of the year. Missing samples are `None` and
/// keep their slot so the time axis of the other samples is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct IrradianceSeries {
    pub year: i32,
    /// Sampling step in hours (1.0 for hourly data).
    pub step_hours: f64,
    pub values: Vec<Option<f64>>,
    /// Start of each sample, when the provider supplies them.
    pub timestamps: Option<Vec<NaiveDateTime>>,
}

impl IrradianceSeries {
    pub fn hourly(year: i32, values: Vec<Option<f64>>) -> Self {
        Self {
            year,
            step_hours: 1.0,
            values,
            timestamps: None,
        }
    }

    pub fn with_timestamps(mut self, timestamps: Vec<NaiveDateTime>) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Number of raw slots, present or not.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present samples with their raw index. Non-finite values count as missing.
    pub fn samples(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|g| g.is_finite()).map(|g| (i, g)))
    }

    pub fn usable_samples(&self) -> usize {
        self.samples().count()
    }
}

// ─── Growth law / time axis ──────────────────────────────────────────────────

/// How installed capacity evolves between two year-end snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthLaw {
    /// Constant relative growth rate.
    Exponential,
    /// Constant absolute additions.
    Linear,
}

impl GrowthLaw {
    pub const ALL: [GrowthLaw; 2] = [GrowthLaw::Exponential, GrowthLaw::Linear];

    pub fn label(self) -> &'static str {
        match self {
            GrowthLaw::Exponential => "exponential",
            GrowthLaw::Linear => "linear",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            GrowthLaw::Exponential => "K_exp",
            GrowthLaw::Linear => "K_lin",
        }
    }
}

/// How a sample is placed on the `[0, 1]` fraction-of-year axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeAxis {
    /// `tau = i / (N - 1)` from the raw sample index.
    #[default]
    Position,
    /// `tau` from each sample's timestamp within the calendar year.
    Timestamp,
}

// ─── Trajectory calibration ──────────────────────────────────────────────────

/// Everything needed to calibrate one year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearInputs {
    pub year: i32,
    /// Capacity at the end of the previous year.
    pub c_prev_kw: f64,
    /// Capacity at the end of `year`.
    pub c_curr_kw: f64,
    pub energy_kwh: f64,
    pub irradiance: IrradianceSeries,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LawFactor {
    pub law: GrowthLaw,
    pub k: f64,
}

/// A successfully calibrated year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearCalibration {
    pub year: i32,
    pub c_prev_kw: f64,
    pub c_curr_kw: f64,
    pub energy_kwh: f64,
    /// Annual irradiance "H" in kWh per kWp.
    pub irradiance_kwh_per_kwp: f64,
    pub factors: Vec<LawFactor>,
}

impl YearCalibration {
    pub fn k(&self, law: GrowthLaw) -> Option<f64> {
        self.factors.iter().find(|f| f.law == law).map(|f| f.k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub year: i32,
    pub k: f64,
}

/// Reduction of the per-year K values of one growth law.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSummary {
    pub law: GrowthLaw,
    pub mean_k: f64,
    pub median_k: f64,
    pub per_year: Vec<CalibrationResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearOutcome {
    pub year: i32,
    pub result: Result<YearCalibration, CalibrationError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryCalibration {
    pub outcomes: Vec<YearOutcome>,
    pub summaries: Vec<CalibrationSummary>,
}

impl TrajectoryCalibration {
    pub fn summary(&self, law: GrowthLaw) -> Option<&CalibrationSummary> {
        self.summaries.iter().find(|s| s.law == law)
    }

    pub fn calibrated(&self) -> impl Iterator<Item = &YearCalibration> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn skipped(&self) -> impl Iterator<Item = (i32, &CalibrationError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.year, e)))
    }
}

// ─── Ratio calibration ───────────────────────────────────────────────────────

/// Cross-sectional inputs at one reference year. Energies in MWh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioInputs {
    pub year: i32,
    pub capacity_locality_kw: f64,
    pub capacity_region_kw: f64,
    pub region_energy_mwh: f64,
    pub locality_energy_mwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioCalibration {
    pub year: i32,
    /// Locality share of regional capacity.
    pub r_cap: f64,
    pub naive_energy_mwh: f64,
    pub trusted_energy_mwh: f64,
    pub k: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_keep_raw_index() {
        let series = IrradianceSeries::hourly(2023, vec![None, Some(10.0), Some(f64::NAN), Some(30.0)]);
        let samples: Vec<_> = series.samples().collect();
        assert_eq!(samples, vec![(1, 10.0), (3, 30.0)]);
        assert_eq!(series.len(), 4);
        assert_eq!(series.usable_samples(), 2);
    }

    #[test]
    fn test_growth_law_from_config_string() {
        let laws: Vec<GrowthLaw> = serde_json::from_str(r#"["linear", "exponential"]"#).unwrap();
        assert_eq!(laws, vec![GrowthLaw::Linear, GrowthLaw::Exponential]);
        let axis: TimeAxis = serde_json::from_str(r#""timestamp""#).unwrap();
        assert_eq!(axis, TimeAxis::Timestamp);
        assert_eq!(TimeAxis::default(), TimeAxis::Position);
    }
}
