//! Favorite-station bookkeeping.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::warn;

use crate::domain::{Station, StationId};
use crate::store::{KeyValueStore, StoreError, codec};

/// Storage key for the persisted id set.
const FAVORITES_KEY: &str = "favorite_stations";

/// The favorite-station id set, with no ordering guarantee.
///
/// Persisted as ids only; after [`Favorites::load`] the published record
/// list is empty until [`Favorites::reattach`] joins the stored ids back
/// to full records.
pub struct Favorites<S> {
    store: S,
    state: Mutex<FavoriteState>,
    tx: watch::Sender<Vec<Station>>,
}

struct FavoriteState {
    ids: HashSet<StationId>,
    entries: Vec<Station>,
}

impl<S: KeyValueStore> Favorites<S> {
    /// Load the persisted id set from the store.
    ///
    /// A blob that fails to decode resets the key instead of failing the
    /// load.
    pub fn load(store: S) -> Result<Self, StoreError> {
        let ids: HashSet<StationId> = match store.get(FAVORITES_KEY)? {
            Some(blob) => match codec::decode_ids(&blob) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    warn!(error = %e, "corrupt favorites blob, resetting");
                    store.remove(FAVORITES_KEY)?;
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        let (tx, _rx) = watch::channel(Vec::new());
        Ok(Self {
            store,
            state: Mutex::new(FavoriteState {
                ids,
                entries: Vec::new(),
            }),
            tx,
        })
    }

    /// Toggle a station's favorite status, persisting and republishing.
    ///
    /// Returns the new status: `true` if the station is now a favorite.
    pub fn toggle(&self, station: &Station) -> Result<bool, StoreError> {
        let (snapshot, now_favorite) = {
            let mut state = self.lock_state();

            let now_favorite = if state.ids.remove(&station.id) {
                state.entries.retain(|s| s.id != station.id);
                false
            } else {
                state.ids.insert(station.id);
                state.entries.push(station.clone());
                true
            };

            self.persist(&state)?;
            (state.entries.clone(), now_favorite)
        };

        self.tx.send_replace(snapshot);
        Ok(now_favorite)
    }

    /// Pure set-membership query.
    pub fn is_favorite(&self, id: StationId) -> bool {
        self.lock_state().ids.contains(&id)
    }

    /// Join the stored ids back to their current full records, dropping
    /// ids not present in `stations` from the published view, and
    /// republish.
    pub fn reattach(&self, stations: &[Station]) {
        let snapshot = {
            let mut state = self.lock_state();
            let entries: Vec<Station> = stations
                .iter()
                .filter(|s| state.ids.contains(&s.id))
                .cloned()
                .collect();
            state.entries = entries.clone();
            entries
        };

        self.tx.send_replace(snapshot);
    }

    /// Empty the favorite set, in memory and in the store.
    pub fn clear(&self) -> Result<(), StoreError> {
        {
            let mut state = self.lock_state();
            state.ids.clear();
            state.entries.clear();
            self.store.remove(FAVORITES_KEY)?;
        }

        self.tx.send_replace(Vec::new());
        Ok(())
    }

    /// The stored id set.
    pub fn ids(&self) -> HashSet<StationId> {
        self.lock_state().ids.clone()
    }

    /// Number of favorites.
    pub fn len(&self) -> usize {
        self.lock_state().ids.len()
    }

    /// Whether no station is marked favorite.
    pub fn is_empty(&self) -> bool {
        self.lock_state().ids.is_empty()
    }

    /// Observe the enriched favorite list.
    pub fn watch(&self) -> watch::Receiver<Vec<Station>> {
        self.tx.subscribe()
    }

    fn persist(&self, state: &FavoriteState) -> Result<(), StoreError> {
        // Stable blob contents regardless of set iteration order.
        let mut ids: Vec<StationId> = state.ids.iter().copied().collect();
        ids.sort_unstable();
        self.store.put(FAVORITES_KEY, &codec::encode_ids(&ids))
    }

    fn lock_state(&self) -> MutexGuard<'_, FavoriteState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
