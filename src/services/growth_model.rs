//! Capacity trajectory over one calendar year.
//!
//! The fleet is known at two year-end snapshots; in between, capacity follows
//! one of the [`GrowthLaw`]s as a function of `tau`, the fraction of the year
//! elapsed (0 at the start, 1 at the end).

use crate::error::CalibrationError;
use crate::models::GrowthLaw;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthModel {
    c_start: f64,
    c_end: f64,
    law: GrowthLaw,
    // ln(c_end / c_start), only used by the exponential law
    rate: f64,
}

impl GrowthModel {
    /// Both endpoints must be strictly positive, whatever the law.
    pub fn new(c_start: f64, c_end: f64, law: GrowthLaw) -> Result<Self, CalibrationError> {
        // `!(x > 0)` also rejects NaN
        if !(c_start > 0.0) || !(c_end > 0.0) {
            return Err(CalibrationError::InvalidCapacity { c_start, c_end });
        }
        Ok(Self {
            c_start,
            c_end,
            law,
            rate: (c_end / c_start).ln(),
        })
    }

    pub fn law(&self) -> GrowthLaw {
        self.law
    }

    pub fn c_start(&self) -> f64 {
        self.c_start
    }

    pub fn c_end(&self) -> f64 {
        self.c_end
    }

    /// Installed capacity (kW) at `tau`, the elapsed fraction of the year.
    pub fn capacity_at(&self, tau: f64) -> f64 {
        // Endpoints are returned as given so both laws meet them exactly.
        if tau == 0.0 {
            return self.c_start;
        }
        if tau == 1.0 {
            return self.c_end;
        }
        match self.law {
            GrowthLaw::Exponential => exponential(self.c_start, self.rate, tau),
            GrowthLaw::Linear => linear(self.c_start, self.c_end, tau),
        }
    }
}

#[inline]
fn exponential(c_start: f64, rate: f64, tau: f64) -> f64 {
    c_start * (rate * tau).exp()
}

#[inline]
fn linear(c_start: f64, c_end: f64, tau: f64) -> f64 {
    c_start + (c_end - c_start) * tau
}
