//! Persisted user preferences: visit history and favorites.
//!
//! Both stores persist bare station ids through an injected
//! [`KeyValueStore`](crate::store::KeyValueStore) and publish enriched
//! record lists through `tokio::sync::watch`. After a restart they hold
//! ids only; the consumer reattaches full records once the authoritative
//! station list arrives from the pipeline. Reattachment is deliberately
//! caller-driven, never automatic.

mod favorites;
mod history;

pub use favorites::Favorites;
pub use history::{MAX_HISTORY_ENTRIES, VisitHistory};
