//! Geographic coordinates stored as fixed-precision microdegrees.

use crate::error::InvalidInputError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MICRODEGREES: f64 = 1_000_000.0;

/// A validated latitude/longitude pair.
///
/// Values are stored as integer microdegrees (six decimal places, roughly 11 cm
/// at the equator), so two coordinates built from the same decimal input always
/// compare equal and hash identically.
///
/// # Examples
///
/// ```
/// use routecast::Coordinate;
///
/// let boulder = Coordinate::new(40.0150, -105.2705).unwrap();
/// assert_eq!(boulder.latitude(), 40.015);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    lat_e6: i32,
    lon_e6: i32,
}

impl Coordinate {
    /// Creates a coordinate, rejecting non-finite values and anything outside
    /// `-90..=90` latitude or `-180..=180` longitude.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidInputError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidInputError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidInputError::Longitude(longitude));
        }
        Ok(Self {
            lat_e6: (latitude * MICRODEGREES).round() as i32,
            lon_e6: (longitude * MICRODEGREES).round() as i32,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.lat_e6 as f64 / MICRODEGREES
    }

    pub fn longitude(&self) -> f64 {
        self.lon_e6 as f64 / MICRODEGREES
    }

    pub(crate) fn latitude_e6(&self) -> i32 {
        self.lat_e6
    }

    pub(crate) fn longitude_e6(&self) -> i32 {
        self.lon_e6
    }

    /// The point a fraction `t` (clamped to `0..=1`) of the way to `other`,
    /// interpolated linearly in degrees.
    pub(crate) fn lerp(&self, other: &Coordinate, t: f64) -> Coordinate {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: i32, b: i32| a + ((f64::from(b) - f64::from(a)) * t).round() as i32;
        Coordinate {
            lat_e6: mix(self.lat_e6, other.lat_e6),
            lon_e6: mix(self.lon_e6, other.lon_e6),
        }
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude(),
                longitude: self.longitude(),
            },
            haversine::Location {
                latitude: other.latitude(),
                longitude: other.longitude(),
            },
            haversine::Units::Kilometers,
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude(), self.longitude())
    }
}
