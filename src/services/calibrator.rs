//! Calibration factor K.
//!
//! Two independent paths:
//!  * trajectory calibration: per year, trusted energy divided by the energy a
//!    growing fleet would produce under the year's irradiance, then reduced
//!    across years per growth law;
//!  * ratio calibration: trusted locality production divided by the naive
//!    capacity-share estimate `R_cap * E_region`.

use tracing::{debug, info, warn};

use crate::error::CalibrationError;
use crate::models::{
    CalibrationResult, CalibrationSummary, GrowthLaw, LawFactor, RatioCalibration, RatioInputs,
    TimeAxis, TrajectoryCalibration, YearCalibration, YearInputs, YearOutcome,
};
use crate::services::growth_model::GrowthModel;
use crate::services::integrator::{Integrator, annual_irradiance_per_kwp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibrator {
    laws: Vec<GrowthLaw>,
    integrator: Integrator,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(GrowthLaw::ALL.to_vec(), TimeAxis::Position)
    }
}

impl Calibrator {
    pub fn new(laws: Vec<GrowthLaw>, time_axis: TimeAxis) -> Self {
        Self {
            laws,
            integrator: Integrator::new(time_axis),
        }
    }

    pub fn laws(&self) -> &[GrowthLaw] {
        &self.laws
    }

    /// K for every selected law over one year.
    pub fn calibrate_year(&self, inputs: &YearInputs) -> Result<YearCalibration, CalibrationError> {
        let YearInputs {
            year,
            c_prev_kw,
            c_curr_kw,
            energy_kwh,
            ref irradiance,
        } = *inputs;

        if !(c_prev_kw > 0.0) || !(c_curr_kw > 0.0) || !(energy_kwh > 0.0) {
            return Err(CalibrationError::MissingYearData {
                year,
                c_prev: c_prev_kw,
                c_curr: c_curr_kw,
                energy_kwh,
            });
        }

        let h = annual_irradiance_per_kwp(irradiance).map_err(|e| e.in_year(year))?;

        let mut factors = Vec::with_capacity(self.laws.len());
        for &law in &self.laws {
            let model = GrowthModel::new(c_prev_kw, c_curr_kw, law).map_err(|e| e.in_year(year))?;
            let expected_kwh = self
                .integrator
                .integrate_weighted(irradiance, &model)
                .map_err(|e| e.in_year(year))?;
            let k = energy_kwh / expected_kwh;
            debug!(year, law = law.label(), expected_kwh, k, "calibrated");
            factors.push(LawFactor { law, k });
        }

        Ok(YearCalibration {
            year,
            c_prev_kw,
            c_curr_kw,
            energy_kwh,
            irradiance_kwh_per_kwp: h,
            factors,
        })
    }

    /// Calibrates each year independently; failed years are recorded and
    /// left out of the per-law reduction.
    pub fn calibrate_years<I>(&self, years: I) -> TrajectoryCalibration
    where
        I: IntoIterator<Item = YearInputs>,
    {
        let outcomes = years.into_iter().map(|inputs| self.calibrate_outcome(&inputs)).collect();
        self.reduce(outcomes)
    }

    /// [`Calibrator::calibrate_year`] recorded as an outcome.
    pub fn calibrate_outcome(&self, inputs: &YearInputs) -> YearOutcome {
        let result = self.calibrate_year(inputs);
        match &result {
            Ok(cal) => info!(year = inputs.year, h = cal.irradiance_kwh_per_kwp, "year calibrated"),
            Err(e) => warn!(year = inputs.year, error = %e, "year skipped"),
        }
        YearOutcome {
            year: inputs.year,
            result,
        }
    }

    /// Per-law summaries over the successful outcomes.
    pub fn reduce(&self, outcomes: Vec<YearOutcome>) -> TrajectoryCalibration {
        let summaries = self
            .laws
            .iter()
            .filter_map(|&law| summarize(law, &outcomes))
            .collect();

        TrajectoryCalibration { outcomes, summaries }
    }
}

/// Mean and median K of one law over the successful years, `None` when no
/// year succeeded.
pub fn summarize(law: GrowthLaw, outcomes: &[YearOutcome]) -> Option<CalibrationSummary> {
    let per_year: Vec<CalibrationResult> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .filter_map(|cal| cal.k(law).map(|k| CalibrationResult { year: cal.year, k }))
        .collect();

    let ks: Vec<f64> = per_year.iter().map(|r| r.k).collect();
    Some(CalibrationSummary {
        law,
        mean_k: mean(&ks)?,
        median_k: upper_median(&ks)?,
        per_year,
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Element at index `len / 2` of the sorted values: for an even count this is
/// the upper of the two middle values, not their average.
pub fn upper_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}

/// K from the capacity-share proxy at one reference year.
pub fn calibrate_ratio(inputs: &RatioInputs) -> Result<RatioCalibration, CalibrationError> {
    let RatioInputs {
        year,
        capacity_locality_kw,
        capacity_region_kw,
        region_energy_mwh,
        locality_energy_mwh,
    } = *inputs;

    if !(capacity_region_kw > 0.0) {
        return Err(CalibrationError::InvalidRatioDenominator {
            year,
            c_region: capacity_region_kw,
        });
    }
    let r_cap = capacity_locality_kw / capacity_region_kw;

    let naive_energy_mwh = r_cap * region_energy_mwh;
    if !(naive_energy_mwh > 0.0) {
        return Err(CalibrationError::InvalidCalibrationDenominator {
            year,
            e_naive: naive_energy_mwh,
        });
    }
    let k = locality_energy_mwh / naive_energy_mwh;
    info!(year, r_cap, naive_energy_mwh, k, "ratio calibration");

    Ok(RatioCalibration {
        year,
        r_cap,
        naive_energy_mwh,
        trusted_energy_mwh: locality_energy_mwh,
        k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IrradianceSeries;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn flat_year(year: i32, c_prev: f64, c_curr: f64, energy_kwh: f64) -> YearInputs {
        YearInputs {
            year,
            c_prev_kw: c_prev,
            c_curr_kw: c_curr,
            energy_kwh,
            irradiance: IrradianceSeries::hourly(year, vec![Some(125.0); 8760]),
        }
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0, 4.0], 3.0)]
    #[case(&[4.0, 1.0, 3.0, 2.0], 3.0)]
    #[case(&[5.0, 1.0, 3.0], 3.0)]
    #[case(&[0.9], 0.9)]
    fn test_upper_median(#[case] values: &[f64], #[case] expected: f64) {
        assert_eq!(upper_median(values), Some(expected));
    }

    #[test]
    fn test_reductions_of_nothing() {
        assert_eq!(mean(&[]), None);
        assert_eq!(upper_median(&[]), None);
    }

    #[test]
    fn test_mean() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_constant_fleet_k() {
        // 100 kW all year under H = 1095 kWh/kWp -> 109 500 kWh expected.
        let cal = Calibrator::default()
            .calibrate_year(&flat_year(2023, 100.0, 100.0, 87_600.0))
            .unwrap();
        assert_relative_eq!(cal.irradiance_kwh_per_kwp, 1095.0, epsilon = 1e-9);
        assert_relative_eq!(cal.k(GrowthLaw::Exponential).unwrap(), 0.8, max_relative = 1e-12);
        assert_relative_eq!(cal.k(GrowthLaw::Linear).unwrap(), 0.8, max_relative = 1e-12);
    }

    #[test]
    fn test_growth_laws_differ_for_growing_fleet() {
        // Under flat irradiance the exponential trajectory averages the
        // logarithmic mean, the linear one the arithmetic mean.
        let cal = Calibrator::default()
            .calibrate_year(&flat_year(2022, 100.0, 200.0, 100_000.0))
            .unwrap();
        let k_exp = cal.k(GrowthLaw::Exponential).unwrap();
        let k_lin = cal.k(GrowthLaw::Linear).unwrap();
        assert!(k_exp > k_lin);

        let log_mean = 100.0 / std::f64::consts::LN_2;
        assert_relative_eq!(k_exp, 100_000.0 / (log_mean * 1095.0), max_relative = 1e-3);
        assert_relative_eq!(k_lin, 100_000.0 / (150.0 * 1095.0), max_relative = 1e-9);
    }

    #[rstest]
    #[case(0.0, 100.0, 1000.0)]
    #[case(100.0, 0.0, 1000.0)]
    #[case(100.0, 120.0, 0.0)]
    #[case(100.0, 120.0, -3.0)]
    fn test_missing_year_data(#[case] c_prev: f64, #[case] c_curr: f64, #[case] energy: f64) {
        let err = Calibrator::default()
            .calibrate_year(&flat_year(2020, c_prev, c_curr, energy))
            .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::MissingYearData {
                year: 2020,
                c_prev,
                c_curr,
                energy_kwh: energy,
            }
        );
    }

    #[test]
    fn test_empty_series_carries_year() {
        let mut inputs = flat_year(2021, 100.0, 110.0, 1000.0);
        inputs.irradiance = IrradianceSeries::hourly(2021, vec![]);
        let err = Calibrator::default().calibrate_year(&inputs).unwrap_err();
        assert_eq!(err.year(), Some(2021));
        assert_eq!(err.kind(), &CalibrationError::EmptySeries { len: 0 });
    }

    #[test]
    fn test_batch_skips_bad_year_and_keeps_others() {
        let batch = vec![
            flat_year(2018, 0.0, 100.0, 50_000.0),
            flat_year(2019, 100.0, 100.0, 109_500.0),
            flat_year(2020, 100.0, 100.0, 219_000.0),
        ];
        let result = Calibrator::default().calibrate_years(batch);

        assert_eq!(result.outcomes.len(), 3);
        let skipped: Vec<i32> = result.skipped().map(|(y, _)| y).collect();
        assert_eq!(skipped, vec![2018]);

        for law in GrowthLaw::ALL {
            let summary = result.summary(law).unwrap();
            let years: Vec<i32> = summary.per_year.iter().map(|r| r.year).collect();
            assert_eq!(years, vec![2019, 2020]);
            assert_relative_eq!(summary.mean_k, 1.5, max_relative = 1e-12);
            assert_relative_eq!(summary.median_k, 2.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_laws_are_summarized_separately() {
        let calibrator = Calibrator::new(vec![GrowthLaw::Linear], TimeAxis::Position);
        let result = calibrator.calibrate_years(vec![flat_year(2019, 100.0, 300.0, 10_000.0)]);
        assert!(result.summary(GrowthLaw::Exponential).is_none());
        let lin = result.summary(GrowthLaw::Linear).unwrap();
        assert_eq!(lin.per_year.len(), 1);
        assert_eq!(lin.mean_k, lin.median_k);
    }

    #[test]
    fn test_no_valid_year_gives_no_summary() {
        let result = Calibrator::default().calibrate_years(vec![flat_year(2019, 0.0, 0.0, 0.0)]);
        assert!(result.summaries.is_empty());
        assert_eq!(result.calibrated().count(), 0);
    }

    #[test]
    fn test_ratio_calibration() {
        let cal = calibrate_ratio(&RatioInputs {
            year: 2023,
            capacity_locality_kw: 100.0,
            capacity_region_kw: 10_000.0,
            region_energy_mwh: 5000.0,
            locality_energy_mwh: 60.0,
        })
        .unwrap();
        assert_relative_eq!(cal.r_cap, 0.01);
        assert_relative_eq!(cal.naive_energy_mwh, 50.0);
        assert_relative_eq!(cal.k, 1.2, max_relative = 1e-12);
    }

    #[test]
    fn test_ratio_rejects_zero_region_capacity() {
        let err = calibrate_ratio(&RatioInputs {
            year: 2023,
            capacity_locality_kw: 100.0,
            capacity_region_kw: 0.0,
            region_energy_mwh: 5000.0,
            locality_energy_mwh: 60.0,
        })
        .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::InvalidRatioDenominator {
                year: 2023,
                c_region: 0.0
            }
        );
    }

    #[test]
    fn test_ratio_rejects_zero_naive_estimate() {
        let err = calibrate_ratio(&RatioInputs {
            year: 2022,
            capacity_locality_kw: 100.0,
            capacity_region_kw: 10_000.0,
            region_energy_mwh: 0.0,
            locality_energy_mwh: 60.0,
        })
        .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::InvalidCalibrationDenominator {
                year: 2022,
                e_naive: 0.0
            }
        );
    }
}
