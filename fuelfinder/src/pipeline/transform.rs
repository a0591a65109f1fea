//! Pure station-list transformations.
//!
//! Every function returns new data; no input list or record is mutated in
//! place.

use std::collections::HashSet;

use crate::domain::{Coordinate, Station, StationId};

/// A station joined with its favorite status at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct StationView {
    pub station: Station,
    pub is_favorite: bool,
}

/// Annotate each station with its great-circle distance from `reference`.
pub fn annotate_distances(stations: &[Station], reference: Coordinate) -> Vec<Station> {
    stations
        .iter()
        .map(|s| s.with_distance_from(reference))
        .collect()
}

/// Keep stations whose name or address contains `query` as a
/// case-insensitive substring, preserving relative order.
///
/// A blank query returns the input unchanged. No tokenization, no fuzzy
/// matching.
pub fn filter_by_query(stations: &[Station], query: &str) -> Vec<Station> {
    let query = query.trim();
    if query.is_empty() {
        return stations.to_vec();
    }

    let needle = query.to_lowercase();
    stations
        .iter()
        .filter(|s| {
            s.name.to_lowercase().contains(&needle) || s.address.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Order stations ascending by distance. Stable: equal distances keep
/// their original relative order.
pub fn sort_by_distance(stations: &[Station]) -> Vec<Station> {
    let mut sorted = stations.to_vec();
    sorted.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    sorted
}

/// Join each station with its membership in the favorite-id set.
pub fn with_favorite_status(
    stations: &[Station],
    favorites: &HashSet<StationId>,
) -> Vec<StationView> {
    stations
        .iter()
        .map(|s| StationView {
            station: s.clone(),
            is_favorite: favorites.contains(&s.id),
        })
        .collect()
}

/// The full consumer pipeline: distance annotation, query filter, distance
/// sort, favorite annotation.
///
/// Without a reference coordinate the distance steps are skipped entirely:
/// each station keeps its prior `distance_km` and input order is
/// preserved.
pub fn process(
    stations: &[Station],
    reference: Option<Coordinate>,
    query: &str,
    favorites: &HashSet<StationId>,
) -> Vec<StationView> {
    let annotated = match reference {
        Some(reference) => annotate_distances(stations, reference),
        None => stations.to_vec(),
    };

    let filtered = filter_by_query(&annotated, query);
    let ordered = if reference.is_some() {
        sort_by_distance(&filtered)
    } else {
        filtered
    };

    with_favorite_status(&ordered, favorites)
}
