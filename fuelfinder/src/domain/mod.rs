//! Core domain types: stations and coordinates.

mod coord;
mod station;

pub use coord::Coordinate;
pub use station::{Station, StationId, find_by_id};
