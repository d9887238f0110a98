//! Calibration of a locality's photovoltaic production against public
//! register, regional and irradiance data.

pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod services;
pub mod telemetry;
