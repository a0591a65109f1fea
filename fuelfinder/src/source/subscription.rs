//! Change-stream subscription interface.

use tokio::sync::mpsc;

use super::error::SourceError;

/// An event pushed by the remote source.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A full snapshot of raw station records.
    Snapshot(Vec<serde_json::Value>),
    /// The change stream reported a failure.
    Error(SourceError),
}

/// A live subscription to a source's change stream.
///
/// Dropping the subscription closes its event channel; a conforming source
/// stops producing for it once it observes the closed channel, so no
/// listener outlives its subscriber.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<SourceEvent>,
}

impl Subscription {
    /// Wrap a channel receiver fed by the source.
    pub fn new(events: mpsc::Receiver<SourceEvent>) -> Self {
        Self { events }
    }

    /// Wait for the next event. `None` means the source closed the stream.
    pub async fn recv(&mut self) -> Option<SourceEvent> {
        self.events.recv().await
    }
}

/// A push-based remote store of station records.
pub trait StationSource {
    /// Open a change-stream subscription.
    ///
    /// The subscriber receives the current snapshot first (when the source
    /// has one), then a new snapshot on every change.
    fn subscribe(&self) -> Subscription;
}
