//! Online/offline state reporting.

use std::sync::Arc;

use tokio::sync::watch;

/// Reports current and streaming connectivity state.
pub trait Connectivity {
    /// Whether the network is currently reachable.
    fn is_available(&self) -> bool;

    /// Subscribe to connectivity changes.
    ///
    /// The receiver's current value is the latest known state; the
    /// receiver is notified on every subsequent change.
    fn observe(&self) -> watch::Receiver<bool>;
}

/// Watch-backed connectivity flag.
///
/// Host integrations push platform connectivity events into this via
/// [`SharedConnectivity::set_available`]; tests flip it directly.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl SharedConnectivity {
    /// Create a flag with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Record a connectivity change, notifying all observers.
    pub fn set_available(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

impl Connectivity for SharedConnectivity {
    fn is_available(&self) -> bool {
        *self.tx.borrow()
    }

    fn observe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
