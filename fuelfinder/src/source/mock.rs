//! Mock station source for tests and offline development.
//!
//! Serves a pre-loaded snapshot to every new subscriber and lets callers
//! push further snapshots or stream errors, mimicking a realtime
//! database's change stream without network access.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use super::error::SourceError;
use super::subscription::{SourceEvent, StationSource, Subscription};

/// Capacity of each subscriber's event channel.
const CHANNEL_CAPACITY: usize = 16;

/// In-process station source.
#[derive(Debug, Clone)]
pub struct MockStationSource {
    /// Snapshot served to each new subscriber, if any.
    initial: Arc<Option<Vec<serde_json::Value>>>,
    updates: broadcast::Sender<SourceEvent>,
}

impl MockStationSource {
    /// Source with no initial snapshot; subscribers see only pushed events.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Source that serves `records` to every new subscriber.
    pub fn with_snapshot(records: Vec<serde_json::Value>) -> Self {
        Self::build(Some(records))
    }

    /// Load the initial snapshot from a JSON file containing an array of
    /// raw station records.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SourceError::Data {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;

        let records: Vec<serde_json::Value> =
            serde_json::from_str(&json).map_err(|e| SourceError::Data {
                message: format!("failed to parse {}: {}", path.display(), e),
            })?;

        Ok(Self::with_snapshot(records))
    }

    fn build(initial: Option<Vec<serde_json::Value>>) -> Self {
        let (updates, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            initial: Arc::new(initial),
            updates,
        }
    }

    /// Push a new snapshot to all live subscribers.
    pub fn push_snapshot(&self, records: Vec<serde_json::Value>) {
        let _ = self.updates.send(SourceEvent::Snapshot(records));
    }

    /// Push a change-stream failure to all live subscribers.
    pub fn push_error(&self, message: impl Into<String>) {
        let _ = self.updates.send(SourceEvent::Error(SourceError::Remote {
            message: message.into(),
        }));
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl Default for MockStationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StationSource for MockStationSource {
    fn subscribe(&self) -> Subscription {
        // Register for updates before handing control back, so pushes that
        // race with the subscribe call are not lost.
        let mut updates = self.updates.subscribe();
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let initial = Arc::clone(&self.initial);

        tokio::spawn(async move {
            if let Some(records) = initial.as_ref()
                && events_tx
                    .send(SourceEvent::Snapshot(records.clone()))
                    .await
                    .is_err()
            {
                return;
            }

            loop {
                tokio::select! {
                    received = updates.recv() => {
                        let event = match received {
                            Ok(event) => event,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    // Subscriber dropped the subscription: stop promptly so
                    // the listener does not linger.
                    _ = events_tx.closed() => break,
                }
            }
        });

        Subscription::new(events_rx)
    }
}
