//! The station data pipeline.
//!
//! A pure transformation layer (distance annotation, query filtering,
//! distance sorting, favorite annotation) plus the reconciliation feed
//! that keeps the input station list current across online/offline
//! transitions. The pipeline owns no persistent state; the cache and
//! preference stores it collaborates with own theirs exclusively.

mod error;
mod reconcile;
mod transform;

pub use error::PipelineError;
pub use reconcile::{FeedItem, StationFeed, spawn_feed};
pub use transform::{
    StationView, annotate_distances, filter_by_query, process, sort_by_distance,
    with_favorite_status,
};
