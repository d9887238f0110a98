pub mod calibration;
pub mod opendata;

pub use calibration::*;
