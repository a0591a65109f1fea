//! Geographic coordinates and great-circle distance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers, as used by the Haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 point: latitude and longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from decimal degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in kilometers, via the Haversine
    /// formula.
    pub fn haversine_km(&self, other: &Self) -> f64 {
        let lat_diff = (other.latitude - self.latitude).to_radians();
        let lon_diff = (other.longitude - self.longitude).to_radians();

        let a = (lat_diff / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (lon_diff / 2.0).sin().powi(2);
        // Rounding can push `a` past 1 for near-antipodal points, which
        // would make the square root below NaN.
        let a = a.min(1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}
