#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate transforms between WGS84 and the China-specific offset datums.
//!
//! Three reference systems are supported:
//!
//! 1. **WGS84**: the GPS datum used by satellite positioning and most
//!    global mapping platforms.
//! 2. **GCJ02**: the regulated offset datum. Derived from WGS84 by a fixed
//!    empirical correction that only applies inside
//!    [`is_in_offset_region`]; outside that box every transform here is the
//!    identity.
//! 3. **BD09**: a second polar-coordinate shift layered on top of GCJ02 by
//!    a regional map provider.
//!
//! The formulas are the widely deployed empirical approximations. Constants
//! and the order of floating point operations follow the published form
//! exactly, including the approximation error of the GCJ02 inverse.
//!
//! Everything in this crate is pure: no I/O and no state.

pub mod format;
pub mod system;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Semi-major axis used by the GCJ02 correction (Krasovsky 1940), in meters.
pub const EARTH_RADIUS: f64 = 6_378_245.0;

/// Eccentricity squared used by the GCJ02 correction.
pub const EE: f64 = 0.006_693_421_622_965_943;

/// Angular constant of the BD09 shift.
pub const X_PI: f64 = PI * 3000.0 / 180.0;

/// Earth radius used for great-circle distances, in kilometers.
pub const HAVERSINE_RADIUS_KM: f64 = 6378.137;

/// Longitude bounds of the region where the offset correction applies.
pub const REGION_LNG: (f64, f64) = (72.004, 137.8347);

/// Latitude bounds of the region where the offset correction applies.
pub const REGION_LAT: (f64, f64) = (0.8293, 55.8271);

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees (east positive).
    pub longitude: f64,
    /// Latitude in degrees (north positive).
    pub latitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from a longitude/latitude pair.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether this coordinate is inside the valid WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.longitude, self.latitude)
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance_meters(
            self.longitude,
            self.latitude,
            other.longitude,
            other.latitude,
        )
    }
}

/// Whether a point lies inside the bounding box where the offset correction
/// is applied.
#[must_use]
pub fn is_in_offset_region(lng: f64, lat: f64) -> bool {
    lng >= REGION_LNG.0 && lng <= REGION_LNG.1 && lat >= REGION_LAT.0 && lat <= REGION_LAT.1
}

/// Whether a longitude/latitude pair is finite and within the WGS84 ranges.
#[must_use]
pub fn is_valid_coordinate(lng: f64, lat: f64) -> bool {
    !lng.is_nan() && !lat.is_nan() && (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat)
}

/// Converts WGS84 to GCJ02. Identity outside [`is_in_offset_region`].
#[must_use]
pub fn wgs84_to_gcj02(lng: f64, lat: f64) -> Coordinate {
    if !is_in_offset_region(lng, lat) {
        return Coordinate::new(lng, lat);
    }

    let (dlng, dlat) = offset_delta(lng, lat);
    Coordinate::new(lng + dlng, lat + dlat)
}

/// Converts GCJ02 back to WGS84. Identity outside [`is_in_offset_region`].
///
/// The correction is re-derived from the *offset* coordinate and
/// subtracted, so the result carries the usual few-centimeter approximation
/// error of this transform family.
#[must_use]
pub fn gcj02_to_wgs84(lng: f64, lat: f64) -> Coordinate {
    if !is_in_offset_region(lng, lat) {
        return Coordinate::new(lng, lat);
    }

    let (dlng, dlat) = offset_delta(lng, lat);
    Coordinate::new(lng - dlng, lat - dlat)
}

/// Converts GCJ02 to BD09. Always applied.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn gcj02_to_bd09(lng: f64, lat: f64) -> Coordinate {
    let z = (lng * lng + lat * lat).sqrt() + 0.00002 * (lat * X_PI).sin();
    let theta = lat.atan2(lng) + 0.000_003 * (lng * X_PI).cos();
    Coordinate::new(z * theta.cos() + 0.0065, z * theta.sin() + 0.006)
}

/// Converts BD09 to GCJ02. Always applied.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn bd09_to_gcj02(lng: f64, lat: f64) -> Coordinate {
    let x = lng - 0.0065;
    let y = lat - 0.006;
    let z = (x * x + y * y).sqrt() - 0.00002 * (y * X_PI).sin();
    let theta = y.atan2(x) - 0.000_003 * (x * X_PI).cos();
    Coordinate::new(z * theta.cos(), z * theta.sin())
}

/// Converts WGS84 directly to BD09 (GCJ02 then the BD09 shift).
///
/// Points outside [`is_in_offset_region`] are returned unchanged: the BD09
/// shift is only meaningful on top of an offset coordinate.
#[must_use]
pub fn wgs84_to_bd09(lng: f64, lat: f64) -> Coordinate {
    if !is_in_offset_region(lng, lat) {
        return Coordinate::new(lng, lat);
    }

    let gcj = wgs84_to_gcj02(lng, lat);
    gcj02_to_bd09(gcj.longitude, gcj.latitude)
}

/// Converts BD09 directly to WGS84 (BD09 shift removed, then GCJ02 inverse).
///
/// Points outside [`is_in_offset_region`] are returned unchanged.
#[must_use]
pub fn bd09_to_wgs84(lng: f64, lat: f64) -> Coordinate {
    if !is_in_offset_region(lng, lat) {
        return Coordinate::new(lng, lat);
    }

    let gcj = bd09_to_gcj02(lng, lat);
    gcj02_to_wgs84(gcj.longitude, gcj.latitude)
}

/// Great-circle distance in meters.
///
/// Uses an Earth radius of 6378.137 km and rounds to 4 decimal places in
/// kilometers before converting, so the result has 10 cm resolution.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn haversine_distance_meters(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let rad_lat1 = lat1 * PI / 180.0;
    let rad_lat2 = lat2 * PI / 180.0;
    let a = rad_lat1 - rad_lat2;
    let b = lng1 * PI / 180.0 - lng2 * PI / 180.0;

    let mut s = 2.0
        * ((a / 2.0).sin().powi(2)
            + rad_lat1.cos() * rad_lat2.cos() * (b / 2.0).sin().powi(2))
        .sqrt()
        .asin();
    s *= HAVERSINE_RADIUS_KM;
    s = (s * 10000.0).round() / 10000.0;
    s * 1000.0
}

/// The GCJ02 correction `(dlng, dlat)` in degrees for a point.
#[allow(clippy::suboptimal_flops)]
fn offset_delta(lng: f64, lat: f64) -> (f64, f64) {
    let mut dlat = transform_lat(lng - 105.0, lat - 35.0);
    let mut dlng = transform_lng(lng - 105.0, lat - 35.0);

    let radlat = lat / 180.0 * PI;
    let mut magic = radlat.sin();
    magic = 1.0 - EE * magic * magic;
    let sqrtmagic = magic.sqrt();

    dlat = (dlat * 180.0) / ((EARTH_RADIUS * (1.0 - EE)) / (magic * sqrtmagic) * PI);
    dlng = (dlng * 180.0) / (EARTH_RADIUS / sqrtmagic * radlat.cos() * PI);

    (dlng, dlat)
}

#[allow(clippy::suboptimal_flops)]
fn transform_lat(lng: f64, lat: f64) -> f64 {
    let mut ret = -100.0
        + 2.0 * lng
        + 3.0 * lat
        + 0.2 * lat * lat
        + 0.1 * lng * lat
        + 0.2 * lng.abs().sqrt();
    ret += (20.0 * (6.0 * lng * PI).sin() + 20.0 * (2.0 * lng * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (lat * PI).sin() + 40.0 * (lat / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (lat / 12.0 * PI).sin() + 320.0 * (lat * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

#[allow(clippy::suboptimal_flops)]
fn transform_lng(lng: f64, lat: f64) -> f64 {
    let mut ret =
        300.0 + lng + 2.0 * lat + 0.1 * lng * lng + 0.1 * lng * lat + 0.1 * lng.abs().sqrt();
    ret += (20.0 * (6.0 * lng * PI).sin() + 20.0 * (2.0 * lng * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (lng * PI).sin() + 40.0 * (lng / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (lng / 12.0 * PI).sin() + 300.0 * (lng / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}
