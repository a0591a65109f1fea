//! Remote station source.
//!
//! The remote store is a push-based collection of raw station records: each
//! subscriber receives a full snapshot of the collection on every change,
//! or an error when the change stream fails. Records arrive untyped; the
//! pipeline parses them one by one so a single malformed record never
//! poisons a batch.

mod error;
mod mock;
mod subscription;

pub use error::SourceError;
pub use mock::MockStationSource;
pub use subscription::{SourceEvent, StationSource, Subscription};
