//! Plain-text reports printed by the CLI.

use std::fmt::Write;

use crate::error::CalibrationError;
use crate::models::{GrowthLaw, IrradianceSeries, TrajectoryCalibration};
use crate::services::integrator::annual_irradiance_per_kwp;
use crate::services::pipeline::RatioReport;

pub fn trajectory(location: &str, laws: &[GrowthLaw], result: &TrajectoryCalibration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Annual calibration K for {location} ===");

    let mut header = "Year | C_prev (kW) | C_curr (kW) | E (MWh) | H (kWh/kWp)".to_string();
    let mut rule = "-----+-------------+-------------+---------+------------".to_string();
    for law in laws {
        let _ = write!(header, " | {:>7}", law.short_label());
        rule.push_str("-+--------");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(cal) => {
                let _ = write!(
                    out,
                    "{:4} | {:11.1} | {:11.1} | {:7.1} | {:11.1}",
                    cal.year,
                    cal.c_prev_kw,
                    cal.c_curr_kw,
                    cal.energy_kwh / 1000.0,
                    cal.irradiance_kwh_per_kwp
                );
                for &law in laws {
                    match cal.k(law) {
                        Some(k) => out.push_str(&format!(" | {k:7.3}")),
                        None => out.push_str(" |       -"),
                    }
                }
                out.push('\n');
            }
            Err(CalibrationError::MissingYearData { .. }) => {
                let _ = writeln!(out, "{:4} | (missing data)", outcome.year);
            }
            Err(e) => {
                let _ = writeln!(out, "{:4} | (skipped: {})", outcome.year, e.kind());
            }
        }
    }

    for law in laws {
        let label = law.short_label();
        match result.summary(*law) {
            Some(s) => {
                let _ = writeln!(out, "\nSuggested K ({} capacity, {} years):", law.label(), s.per_year.len());
                let _ = writeln!(out, "  Mean {label}  : {:.3}", s.mean_k);
                let _ = writeln!(out, "  Median {label}: {:.3}", s.median_k);
            }
            None => {
                let _ = writeln!(out, "\nNo year could be calibrated with {} capacity.", law.label());
            }
        }
    }
    out
}

pub fn ratio(location: &str, region: &str, report: &RatioReport) -> String {
    let RatioReport {
        inputs,
        calibration,
        implied_region_yield,
        latest_r_cap,
    } = report;
    let year = inputs.year;

    let mut out = String::new();
    let _ = writeln!(out, "{year} {location} total PV capacity:\t{:.1} kW", inputs.capacity_locality_kw);
    let _ = writeln!(out, "{year} {region} total PV capacity:\t{:.1} kW", inputs.capacity_region_kw);
    let _ = writeln!(out, "Capacity ratio R_cap = {location} / {region} = {:.6}", calibration.r_cap);
    let _ = writeln!(out);
    let _ = writeln!(out, "{year} {region} regional PV production:\t{:.0} MWh", inputs.region_energy_mwh);
    let _ = writeln!(out, "Implied {region} PV yield (should be around 1): {implied_region_yield:.3} MWh/kW/year");
    let _ = writeln!(out, "Naive {location} estimate R_cap * regional: {:.1} MWh", calibration.naive_energy_mwh);
    let _ = writeln!(out, "{year} trusted {location} PV production:\t{:.1} MWh", calibration.trusted_energy_mwh);
    let _ = writeln!(out);
    let _ = writeln!(out, "Calibration factor K = trusted / naive = {:.3}", calibration.k);
    let _ = writeln!(out);
    let _ = writeln!(out, "For a real-time estimate, use:");
    let _ = writeln!(out, "    {location}_solar(t) ≈ K * R_cap(latest) * {region}_solar(t)");
    let _ = writeln!(out, "with    K     = {:.3}", calibration.k);
    match latest_r_cap {
        Some(r) => out.push_str(&format!("        R_cap = {r:.6} (latest register snapshot)\n")),
        None => out.push_str("        R_cap = unavailable (latest register snapshot missing)\n"),
    }
    let _ = writeln!(out, "Calibrated on year {year}.");
    out
}

/// Annual irradiance per year, or why it could not be computed.
pub fn irradiance(series: &[IrradianceSeries]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Year | samples | missing | H (kWh/kWp)");
    for s in series {
        let missing = s.len() - s.usable_samples();
        let h = match annual_irradiance_per_kwp(s) {
            Ok(h) => format!("{h:11.1}"),
            Err(e) => format!("({e})"),
        };
        let _ = writeln!(out, "{:4} | {:7} | {:7} | {h}", s.year, s.len(), missing);
    }
    out
}
