//! Offline tilted-irradiance engine.
//!
//! Synthesises a year of hourly plane-of-array irradiance without network
//! access:
//!  1. Solar geometry: declination, equation of time, hour angle, elevation,
//!     azimuth (Spencer 1971)
//!  2. Extraterrestrial irradiance: eccentricity-corrected solar constant
//!  3. Clear sky: simplified Bird & Hulstrom DNI / DHI / GHI
//!  4. Transposition onto the panel plane (isotropic sky, ground albedo)
//!  5. Climatological cloud attenuation: latitude band, season, a
//!     deterministic day-to-day scatter and an afternoon build-up

use std::f64::consts::PI;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use crate::error::SourceError;
use crate::models::IrradianceSeries;
use crate::services::sources::{IrradianceSource, SiteParameters};

const SOLAR_CONSTANT: f64 = 1361.0; // W/m²
const DEG: f64 = PI / 180.0;
const GROUND_ALBEDO: f64 = 0.20;
const LINKE_TURBIDITY: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub elevation_deg: f64,
    /// Clockwise from north.
    pub azimuth_deg: f64,
    pub local_solar_hour: f64,
    pub day_of_year: f64,
}

/// Horizontal clear-sky components (W/m²).
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClearSky {
    dni: f64,
    dhi: f64,
    ghi: f64,
}

#[inline]
fn day_angle(doy: f64) -> f64 {
    2.0 * PI * (doy - 1.0) / 365.0
}

pub fn solar_position(lat_deg: f64, lon_deg: f64, utc: DateTime<Utc>) -> SolarPosition {
    let doy = utc.ordinal() as f64;
    let ut_h = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
    let b = day_angle(doy);

    let decl = 0.006918 - 0.399912 * b.cos() + 0.070257 * b.sin() - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin(); // rad

    let eot_min = 229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    let lst_h = (ut_h + lon_deg / 15.0 + eot_min / 60.0).rem_euclid(24.0);
    let omega = 15.0 * (lst_h - 12.0) * DEG;

    let lat = lat_deg * DEG;
    let sin_alpha = lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos();
    let alpha = sin_alpha.clamp(-1.0, 1.0).asin();

    let denom = alpha.cos() * lat.cos();
    let cos_az = if denom.abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / denom
    } else {
        0.0
    };
    let az = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth_deg = if omega > 0.0 { 360.0 - az } else { az };

    SolarPosition {
        elevation_deg: alpha / DEG,
        azimuth_deg,
        local_solar_hour: lst_h,
        day_of_year: doy,
    }
}

fn extraterrestrial(doy: f64) -> f64 {
    let b = day_angle(doy);
    SOLAR_CONSTANT
        * (1.00011 + 0.034221 * b.cos() + 0.00128 * b.sin() + 0.000719 * (2.0 * b).cos()
            + 0.000077 * (2.0 * b).sin())
}

fn clear_sky(pos: &SolarPosition) -> ClearSky {
    if pos.elevation_deg <= 0.1 {
        return ClearSky { dni: 0.0, dhi: 0.0, ghi: 0.0 };
    }
    let sin_alpha = (pos.elevation_deg * DEG).sin();
    let e0 = extraterrestrial(pos.day_of_year);

    // Kasten & Young (1989)
    let am = (1.0 / (sin_alpha + 0.50572 * (pos.elevation_deg + 6.07995).powf(-1.6364))).max(1.0);

    let t_rayleigh = (-0.0903 * am.powf(0.84) * (1.0 + am - am.powf(1.01))).exp();
    let t_ozone = 1.0 - 0.0013 * am;
    let t_aerosol = (-0.09 * LINKE_TURBIDITY.powf(0.978) * am.powf(0.9455)).exp();
    let t_water = 1.0 - 0.0075 * am.powf(0.65);
    let t_total = t_rayleigh * t_ozone * t_aerosol * t_water;

    let dni = 0.9762 * e0 * t_total;
    let back_scatter = 0.5 * (0.92 - t_aerosol.ln().abs() / 10.0).clamp(0.2, 0.5);
    let dhi = (0.79 * e0 * sin_alpha * (1.0 - t_total) * (0.5 * (1.0 - t_rayleigh) + back_scatter)
        / (1.0 - am + am.powf(1.02)))
    .max(0.0);

    ClearSky {
        dni,
        dhi,
        ghi: dni * sin_alpha + dhi,
    }
}

/// Clear-sky irradiance on a plane tilted by `tilt_deg` facing
/// `surface_azimuth_deg` (clockwise from north).
fn transpose(pos: &SolarPosition, sky: &ClearSky, tilt_deg: f64, surface_azimuth_deg: f64) -> f64 {
    if sky.ghi <= 0.0 {
        return 0.0;
    }
    let alpha = pos.elevation_deg * DEG;
    let tilt = tilt_deg * DEG;
    let cos_incidence = (alpha.sin() * tilt.cos()
        + alpha.cos() * tilt.sin() * ((pos.azimuth_deg - surface_azimuth_deg) * DEG).cos())
    .max(0.0);

    let beam = sky.dni * cos_incidence;
    let diffuse = sky.dhi * (1.0 + tilt.cos()) / 2.0;
    let reflected = sky.ghi * GROUND_ALBEDO * (1.0 - tilt.cos()) / 2.0;
    (beam + diffuse + reflected).max(0.0)
}

/// Fraction of clear-sky irradiance reaching the panel, in `[0.15, 1]`.
fn cloud_attenuation(lat_deg: f64, lon_deg: f64, doy: f64, lst_h: f64) -> f64 {
    // clearest around the local summer solstice
    let season = if lat_deg >= 0.0 {
        (2.0 * PI * (doy - 180.0) / 365.0).cos()
    } else {
        (2.0 * PI * (doy - 365.0) / 365.0).cos()
    };

    let abs_lat = lat_deg.abs();
    let (base, swing) = match abs_lat {
        l if l < 15.0 => (0.55, 0.05), // tropical
        l if l < 35.0 => (0.70, 0.10), // subtropical
        l if l < 55.0 => (0.62, 0.12), // temperate
        l if l < 65.0 => (0.52, 0.10), // sub-polar
        _ => (0.45, 0.10),
    };

    // same value for a given site and day
    let seed = ((lat_deg * 100.0) as i64).wrapping_mul(397)
        ^ ((lon_deg * 100.0) as i64).wrapping_mul(631)
        ^ (doy as i64).wrapping_mul(1013);
    let daily = ((seed % 1000) as f64 / 1000.0 - 0.5) * 2.0 * 0.12;

    let afternoon = if (6.0..=20.0).contains(&lst_h) {
        -0.05 * (lst_h - 13.0) / 7.0
    } else {
        0.0
    };

    (base + swing * season + daily + afternoon).clamp(0.15, 1.0)
}

/// Plane-of-array irradiance (W/m²) for the site at `utc`, cloud included.
pub fn plane_of_array(site: &SiteParameters, utc: DateTime<Utc>) -> f64 {
    let pos = solar_position(site.latitude, site.longitude, utc);
    let sky = clear_sky(&pos);
    // Open-Meteo azimuth is measured from south
    let surface_azimuth = (180.0 + site.azimuth_deg).rem_euclid(360.0);
    let clear = transpose(&pos, &sky, site.tilt_deg, surface_azimuth);
    clear * cloud_attenuation(site.latitude, site.longitude, pos.day_of_year, pos.local_solar_hour)
}

/// Deterministic irradiance source used in offline mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineIrradiance;

#[async_trait]
impl IrradianceSource for OfflineIrradiance {
    async fn hourly_irradiance(
        &self,
        year: i32,
        site: &SiteParameters,
    ) -> Result<IrradianceSeries, SourceError> {
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            NaiveDate::from_ymd_opt(year + 1, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        ) else {
            return Err(SourceError::EmptyIrradiance { year });
        };

        let hours = (end - start).num_hours();
        let timestamps: Vec<_> = (0..hours).map(|h| start + Duration::hours(h)).collect();
        let values = timestamps
            .iter()
            .map(|t| Some(plane_of_array(site, t.and_utc())))
            .collect();

        Ok(IrradianceSeries::hourly(year, values).with_timestamps(timestamps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::integrator::annual_irradiance_per_kwp;
    use chrono::TimeZone;

    fn paris() -> SiteParameters {
        SiteParameters {
            latitude: 48.75,
            longitude: 2.29,
            tilt_deg: 30.0,
            azimuth_deg: 0.0,
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_summer_noon_position() {
        let t = Utc.with_ymd_and_hms(2023, 6, 21, 12, 0, 0).unwrap();
        let pos = solar_position(48.75, 2.29, t);
        assert!(pos.elevation_deg > 60.0, "elevation {:.1}", pos.elevation_deg);
        assert!((150.0..210.0).contains(&pos.azimuth_deg), "azimuth {:.1}", pos.azimuth_deg);
    }

    #[test]
    fn test_winter_noon_is_low() {
        let t = Utc.with_ymd_and_hms(2023, 12, 21, 12, 0, 0).unwrap();
        let pos = solar_position(48.75, 2.29, t);
        assert!(pos.elevation_deg > 10.0 && pos.elevation_deg < 25.0, "elevation {:.1}", pos.elevation_deg);
    }

    #[test]
    fn test_poa_day_and_night() {
        let noon = Utc.with_ymd_and_hms(2023, 6, 21, 12, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2023, 6, 21, 23, 0, 0).unwrap();
        assert!(plane_of_array(&paris(), noon) > 300.0);
        assert_eq!(plane_of_array(&paris(), night), 0.0);
    }

    #[test]
    fn test_north_facing_panel_gets_less() {
        let t = Utc.with_ymd_and_hms(2023, 3, 21, 12, 0, 0).unwrap();
        let mut north = paris();
        north.azimuth_deg = 180.0;
        assert!(plane_of_array(&paris(), t) > plane_of_array(&north, t));
    }

    #[tokio::test]
    async fn test_offline_year() {
        let series = OfflineIrradiance.hourly_irradiance(2024, &paris()).await.unwrap();
        assert_eq!(series.len(), 8784);
        assert_eq!(series.timestamps.as_ref().map(Vec::len), Some(8784));
        assert!(series.values.iter().all(|v| v.is_some_and(|g| g >= 0.0)));

        let h = annual_irradiance_per_kwp(&series).unwrap();
        assert!((600.0..2200.0).contains(&h), "H = {h:.0} kWh/kWp");

        let again = OfflineIrradiance.hourly_irradiance(2024, &paris()).await.unwrap();
        assert_eq!(series, again);
    }
}
