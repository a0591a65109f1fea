//! Visit-history bookkeeping.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::warn;

use crate::domain::{Station, StationId, find_by_id};
use crate::store::{KeyValueStore, StoreError, codec};

/// Storage key for the persisted id sequence.
const HISTORY_KEY: &str = "visited_stations";

/// Most entries retained, most-recent-first.
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Ordered visit history, most-recent-first, deduplicated, capped at
/// [`MAX_HISTORY_ENTRIES`].
///
/// Only ids are persisted. Re-visiting a station moves its id to the front
/// rather than duplicating it; the oldest entry is dropped once the cap is
/// reached. After [`VisitHistory::load`] the published list is empty until
/// [`VisitHistory::reattach`] joins the stored ids back to full records.
pub struct VisitHistory<S> {
    store: S,
    state: Mutex<HistoryState>,
    tx: watch::Sender<Vec<Station>>,
}

struct HistoryState {
    /// Persisted id sequence, most-recent-first. Authoritative.
    ids: Vec<StationId>,
    /// Full records for the ids seen so far, same order as `ids` minus any
    /// id whose record is not yet known.
    entries: Vec<Station>,
}

impl<S: KeyValueStore> VisitHistory<S> {
    /// Load the persisted id sequence from the store.
    ///
    /// A blob that fails to decode resets the key instead of failing the
    /// load.
    pub fn load(store: S) -> Result<Self, StoreError> {
        let ids = match store.get(HISTORY_KEY)? {
            Some(blob) => match codec::decode_ids(&blob) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, "corrupt visit-history blob, resetting");
                    store.remove(HISTORY_KEY)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let (tx, _rx) = watch::channel(Vec::new());
        Ok(Self {
            store,
            state: Mutex::new(HistoryState {
                ids,
                entries: Vec::new(),
            }),
            tx,
        })
    }

    /// Record a visit: the station's id moves to (or enters at) the front,
    /// the sequence is trimmed to the cap, and the new id sequence is
    /// persisted before the enriched list is republished.
    pub fn record_visit(&self, station: &Station) -> Result<(), StoreError> {
        let snapshot = {
            let mut state = self.lock_state();

            state.ids.retain(|id| *id != station.id);
            state.ids.insert(0, station.id);
            state.ids.truncate(MAX_HISTORY_ENTRIES);

            state.entries.retain(|s| s.id != station.id);
            state.entries.insert(0, station.clone());
            state.entries.truncate(MAX_HISTORY_ENTRIES);

            self.store.put(HISTORY_KEY, &codec::encode_ids(&state.ids))?;
            state.entries.clone()
        };

        self.tx.send_replace(snapshot);
        Ok(())
    }

    /// Join the stored ids back to their current full records, dropping
    /// ids not present in `stations` from the published view, and
    /// republish.
    pub fn reattach(&self, stations: &[Station]) {
        let snapshot = {
            let mut state = self.lock_state();
            let entries: Vec<Station> = state
                .ids
                .iter()
                .filter_map(|id| find_by_id(stations, *id).cloned())
                .collect();
            state.entries = entries.clone();
            entries
        };

        self.tx.send_replace(snapshot);
    }

    /// Empty the history, in memory and in the store.
    pub fn clear(&self) -> Result<(), StoreError> {
        {
            let mut state = self.lock_state();
            state.ids.clear();
            state.entries.clear();
            self.store.remove(HISTORY_KEY)?;
        }

        self.tx.send_replace(Vec::new());
        Ok(())
    }

    /// The stored id sequence, most-recent-first.
    pub fn ids(&self) -> Vec<StationId> {
        self.lock_state().ids.clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock_state().ids.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_state().ids.is_empty()
    }

    /// Observe the enriched history list.
    pub fn watch(&self) -> watch::Receiver<Vec<Station>> {
        self.tx.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, HistoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn station(id: u32) -> Station {
        Station {
            id: StationId(id),
            name: format!("Station {id}"),
            address: String::new(),
            image_url: String::new(),
            latitude: 6.13,
            longitude: 1.21,
            distance_km: 0.0,
        }
    }

    #[test]
    fn revisit_moves_to_front_without_duplicating() {
        let history = VisitHistory::load(MemoryStore::new()).unwrap();

        history.record_visit(&station(1)).unwrap();
        history.record_visit(&station(2)).unwrap();
        history.record_visit(&station(1)).unwrap();

        assert_eq!(history.ids(), vec![StationId(1), StationId(2)]);
    }

    #[test]
    fn capped_at_fifty_dropping_the_oldest() {
        let history = VisitHistory::load(MemoryStore::new()).unwrap();

        for id in 1..=51 {
            history.record_visit(&station(id)).unwrap();
        }

        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        let ids = history.ids();
        assert_eq!(ids[0], StationId(51));
        // Station 1 was the oldest and fell off the end.
        assert!(!ids.contains(&StationId(1)));
        assert_eq!(*ids.last().unwrap(), StationId(2));
    }

    #[test]
    fn ids_survive_reload() {
        let store = Arc::new(MemoryStore::new());

        {
            let history = VisitHistory::load(Arc::clone(&store)).unwrap();
            history.record_visit(&station(3)).unwrap();
            history.record_visit(&station(7)).unwrap();
        }

        let reloaded = VisitHistory::load(store).unwrap();
        assert_eq!(reloaded.ids(), vec![StationId(7), StationId(3)]);
        // Details are gone until reattachment.
        assert!(reloaded.watch().borrow().is_empty());
    }

    #[test]
    fn corrupt_blob_resets_the_key() {
        let store = Arc::new(MemoryStore::new());
        store.put("visited_stations", "not a blob").unwrap();

        let history = VisitHistory::load(Arc::clone(&store)).unwrap();
        assert!(history.is_empty());
        assert_eq!(store.get("visited_stations").unwrap(), None);
    }

    #[test]
    fn reattach_joins_ids_to_records_in_order() {
        let store = Arc::new(MemoryStore::new());
        {
            let history = VisitHistory::load(Arc::clone(&store)).unwrap();
            history.record_visit(&station(1)).unwrap();
            history.record_visit(&station(9)).unwrap();
            history.record_visit(&station(2)).unwrap();
        }

        let reloaded = VisitHistory::load(store).unwrap();
        // Station 9 no longer exists upstream.
        reloaded.reattach(&[station(1), station(2)]);

        let published: Vec<StationId> =
            reloaded.watch().borrow().iter().map(|s| s.id).collect();
        assert_eq!(published, vec![StationId(2), StationId(1)]);
    }

    #[test]
    fn clear_empties_memory_and_store() {
        let store = Arc::new(MemoryStore::new());
        let history = VisitHistory::load(Arc::clone(&store)).unwrap();

        history.record_visit(&station(1)).unwrap();
        history.clear().unwrap();

        assert!(history.is_empty());
        assert!(history.watch().borrow().is_empty());
        assert_eq!(store.get("visited_stations").unwrap(), None);
    }

    #[tokio::test]
    async fn watchers_are_notified_on_visit() {
        let history = VisitHistory::load(MemoryStore::new()).unwrap();
        let mut rx = history.watch();

        history.record_visit(&station(4)).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].id, StationId(4));
    }
}
