//! Fuel-station records.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::coord::Coordinate;

/// Stable station identifier assigned by the backing store.
///
/// List operations (dedup, lookup, reattachment) identify stations by id
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u32);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StationId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(StationId)
    }
}

/// A fuel-station record.
///
/// `distance_km` is derived, not authoritative: it defaults to zero
/// (meaning "unknown") and is recomputed whenever a reference coordinate is
/// supplied. Favorite status is deliberately not a field; it is computed
/// against the favorite-id set at read time.
///
/// Only `id` is required on the wire; the remote store may omit any of the
/// display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Kilometers from the current reference point; 0.0 until annotated.
    #[serde(default)]
    pub distance_km: f64,
}

impl Station {
    /// The station's own position.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Copy of this station with `distance_km` computed from `reference`.
    pub fn with_distance_from(&self, reference: Coordinate) -> Self {
        Self {
            distance_km: self.coordinate().haversine_km(&reference),
            ..self.clone()
        }
    }

    /// Distance formatted for display, e.g. `"1.25 km"`.
    pub fn formatted_distance(&self) -> String {
        format!("{:.2} km", self.distance_km)
    }
}

/// Look up a station by id in the current authoritative list.
pub fn find_by_id(stations: &[Station], id: StationId) -> Option<&Station> {
    stations.iter().find(|s| s.id == id)
}
