//! Fuel-station data pipeline.
//!
//! The data layer of a nearby-fuel-stations app: follow a remote station
//! feed while online, fall back to a local cache while offline, annotate
//! stations with their distance from the user, filter and sort them, and
//! keep favorites and visit history persisted as id blobs.

pub mod cache;
pub mod connectivity;
pub mod domain;
pub mod location;
pub mod pipeline;
pub mod prefs;
pub mod source;
pub mod store;
