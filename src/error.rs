use thiserror::Error;

/// Failures of the calibration core.
///
/// Leaf operations (growth model, integrator) report the quantities involved;
/// the calibrator wraps them with [`CalibrationError::in_year`] so every
/// recorded failure names its year.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("invalid capacity endpoints: c_start={c_start} kW, c_end={c_end} kW")]
    InvalidCapacity { c_start: f64, c_end: f64 },

    #[error("no usable irradiance samples ({len} raw samples)")]
    EmptySeries { len: usize },

    #[error("integrated yield {integral} is not positive ({samples} samples)")]
    NonPositiveIntegral { integral: f64, samples: usize },

    #[error("timestamp time axis needs {expected} timestamps, series has {actual}")]
    MissingTimestamps { expected: usize, actual: usize },

    #[error(
        "missing data for {year}: c_prev={c_prev} kW, c_curr={c_curr} kW, energy={energy_kwh} kWh"
    )]
    MissingYearData {
        year: i32,
        c_prev: f64,
        c_curr: f64,
        energy_kwh: f64,
    },

    #[error("irradiance unavailable for {year}: {reason}")]
    IrradianceUnavailable { year: i32, reason: String },

    #[error("regional capacity {c_region} kW for {year} cannot be a ratio denominator")]
    InvalidRatioDenominator { year: i32, c_region: f64 },

    #[error("naive estimate {e_naive} for {year} cannot be a calibration denominator")]
    InvalidCalibrationDenominator { year: i32, e_naive: f64 },

    #[error("{year}: {source}")]
    InYear {
        year: i32,
        #[source]
        source: Box<CalibrationError>,
    },
}

impl CalibrationError {
    /// Attach a year to an error that does not already carry one.
    pub fn in_year(self, year: i32) -> Self {
        match self {
            Self::MissingYearData { .. }
            | Self::IrradianceUnavailable { .. }
            | Self::InvalidRatioDenominator { .. }
            | Self::InvalidCalibrationDenominator { .. }
            | Self::InYear { .. } => self,
            other => Self::InYear {
                year,
                source: Box::new(other),
            },
        }
    }

    /// Year the failure belongs to, if known.
    pub fn year(&self) -> Option<i32> {
        match self {
            Self::MissingYearData { year, .. }
            | Self::IrradianceUnavailable { year, .. }
            | Self::InvalidRatioDenominator { year, .. }
            | Self::InvalidCalibrationDenominator { year, .. }
            | Self::InYear { year, .. } => Some(*year),
            _ => None,
        }
    }

    /// The underlying failure, with any year wrapper removed.
    pub fn kind(&self) -> &CalibrationError {
        match self {
            Self::InYear { source, .. } => source.kind(),
            other => other,
        }
    }
}

/// Failures of the external data collaborators.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dataset {dataset} does not exist")]
    SnapshotNotFound { dataset: String },

    #[error("no record in {dataset} matching {filter}")]
    NoRecord { dataset: String, filter: String },

    #[error("expected one row from {dataset}, got {rows}")]
    UnexpectedRows { dataset: String, rows: usize },

    #[error("field {field} missing from {dataset} response")]
    MissingField { dataset: String, field: String },

    #[error("no irradiance data for {year}")]
    EmptyIrradiance { year: i32 },
}

impl SourceError {
    /// True when the source answered but holds nothing for the request.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::SnapshotNotFound { .. } | Self::NoRecord { .. })
    }
}

/// Failure of a ratio calibration run: fetching or computing.
#[derive(Debug, Error)]
pub enum RatioError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_year_wraps_leaf_errors_once() {
        let err = CalibrationError::EmptySeries { len: 0 }.in_year(2021).in_year(2022);
        assert_eq!(err.year(), Some(2021));
        assert_eq!(err.kind(), &CalibrationError::EmptySeries { len: 0 });
        assert_eq!(err.to_string(), "2021: no usable irradiance samples (0 raw samples)");
    }

    #[test]
    fn test_in_year_keeps_errors_that_have_a_year() {
        let err = CalibrationError::MissingYearData {
            year: 2019,
            c_prev: 0.0,
            c_curr: 10.0,
            energy_kwh: 5.0,
        };
        assert_eq!(err.clone().in_year(2020), err);
    }

    #[test]
    fn test_absent_source_errors() {
        let missing = SourceError::NoRecord {
            dataset: "d".into(),
            filter: "f".into(),
        };
        assert!(missing.is_absent());
        assert!(!SourceError::EmptyIrradiance { year: 2020 }.is_absent());
    }
}
