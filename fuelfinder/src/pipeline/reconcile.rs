//! Online/offline source reconciliation.
//!
//! Produces a continuously-updated station list that follows the remote
//! source while it is reachable and falls back to the local cache
//! otherwise, never surfacing an empty-handed failure while any data is
//! available. The cache is read-through and advisory: the remote source is
//! the only writer of record, and cached data is served only when the
//! source cannot be, so no conflict resolution is needed.
//!
//! Connectivity transitions are handled inside the feed. Losing the
//! network drops the remote subscription and serves the cache; regaining
//! it resubscribes automatically. Consumers subscribe once and never need
//! to resubscribe.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::StationCache;
use crate::connectivity::Connectivity;
use crate::domain::Station;
use crate::source::{SourceEvent, StationSource, Subscription};

use super::error::PipelineError;

/// One emission from the feed.
pub type FeedItem = Result<Vec<Station>, PipelineError>;

/// Capacity of the feed's emission channel. Station lists are small and
/// emissions infrequent, so a short buffer suffices.
const FEED_CAPACITY: usize = 16;

/// Handle to a running reconciliation feed.
///
/// Dropping the handle aborts the dispatch task, which releases the remote
/// subscription with it.
pub struct StationFeed {
    items: mpsc::Receiver<FeedItem>,
    task: JoinHandle<()>,
}

impl StationFeed {
    /// Wait for the next emission. `None` after the feed shuts down.
    pub async fn recv(&mut self) -> Option<FeedItem> {
        self.items.recv().await
    }
}

impl Stream for StationFeed {
    type Item = FeedItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FeedItem>> {
        self.items.poll_recv(cx)
    }
}

impl Drop for StationFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Events driving the dispatch loop.
enum FeedEvent {
    Remote(SourceEvent),
    RemoteClosed,
    Online(bool),
    WatchClosed,
}

/// Start a reconciliation feed over the given source, cache, and
/// connectivity monitor.
pub fn spawn_feed<S, C>(source: Arc<S>, cache: StationCache, connectivity: Arc<C>) -> StationFeed
where
    S: StationSource + Send + Sync + 'static,
    C: Connectivity + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    let changes = connectivity.observe();
    let online = *changes.borrow();

    // Subscribe before handing off to the task, so nothing the source
    // pushes between spawn and first poll is missed.
    let subscription = online.then(|| source.subscribe());

    let task = tokio::spawn(dispatch(source, cache, changes, online, subscription, tx));
    StationFeed { items: rx, task }
}

/// Single-threaded dispatch over the tagged event union: remote snapshot,
/// remote error, connectivity change. All emissions follow the causal
/// order of their triggering events.
async fn dispatch<S>(
    source: Arc<S>,
    cache: StationCache,
    mut changes: watch::Receiver<bool>,
    mut online: bool,
    mut subscription: Option<Subscription>,
    tx: mpsc::Sender<FeedItem>,
) where
    S: StationSource + Send + Sync + 'static,
{
    let mut watch_alive = true;

    if !online {
        debug!("offline at start, serving cache");
        if tx
            .send(fallback(&cache, PipelineError::NoCachedData))
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        let event = match (&mut subscription, watch_alive) {
            (Some(sub), true) => tokio::select! {
                received = sub.recv() => received.map_or(FeedEvent::RemoteClosed, FeedEvent::Remote),
                changed = changes.changed() => match changed {
                    Ok(()) => FeedEvent::Online(*changes.borrow_and_update()),
                    Err(_) => FeedEvent::WatchClosed,
                },
            },
            (Some(sub), false) => sub.recv().await.map_or(FeedEvent::RemoteClosed, FeedEvent::Remote),
            (None, true) => match changes.changed().await {
                Ok(()) => FeedEvent::Online(*changes.borrow_and_update()),
                Err(_) => FeedEvent::WatchClosed,
            },
            // Neither the source nor the monitor can wake us again.
            (None, false) => return,
        };

        match event {
            FeedEvent::Remote(SourceEvent::Snapshot(records)) => {
                let stations = parse_records(&records);
                debug!(count = stations.len(), "remote snapshot received");

                // Only non-empty lists refresh the cache; an empty snapshot
                // is a valid result but must not wipe the fallback.
                if !stations.is_empty()
                    && let Err(e) = cache.save(&stations)
                {
                    warn!(error = %e, "failed to write station cache");
                }

                if tx.send(Ok(stations)).await.is_err() {
                    return;
                }
            }
            FeedEvent::Remote(SourceEvent::Error(e)) => {
                warn!(error = %e, "remote stream failed, trying cache");
                subscription = None;

                let item = fallback(
                    &cache,
                    PipelineError::RemoteUnavailable {
                        message: e.to_string(),
                    },
                );
                if tx.send(item).await.is_err() {
                    return;
                }
            }
            FeedEvent::RemoteClosed => {
                debug!("remote stream closed, awaiting connectivity change");
                subscription = None;
            }
            FeedEvent::Online(now_online) => {
                if now_online == online {
                    continue;
                }
                online = now_online;

                if online {
                    debug!("connectivity regained, resubscribing to remote source");
                    subscription = Some(source.subscribe());
                } else {
                    debug!("connectivity lost, serving cache");
                    subscription = None;
                    if tx
                        .send(fallback(&cache, PipelineError::NoCachedData))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            FeedEvent::WatchClosed => {
                watch_alive = false;
            }
        }
    }
}

/// Serve the cache, or the given failure when it has nothing.
fn fallback(cache: &StationCache, otherwise: PipelineError) -> FeedItem {
    match cache.load() {
        Some(stations) if !stations.is_empty() => {
            debug!(count = stations.len(), "serving cached stations");
            Ok(stations)
        }
        _ => Err(otherwise),
    }
}

/// Parse raw records, skipping any that fail to parse. One malformed
/// station never fails the batch.
fn parse_records(records: &[serde_json::Value]) -> Vec<Station> {
    records
        .iter()
        .filter_map(|record| match serde_json::from_value(record.clone()) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!(error = %e, "skipping malformed station record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StationCacheConfig;
    use crate::connectivity::SharedConnectivity;
    use crate::domain::StationId;
    use crate::source::MockStationSource;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    fn record(id: u32, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "address": format!("{name} road"),
            "imageUrl": "",
            "latitude": 6.13,
            "longitude": 1.21,
        })
    }

    fn station(id: u32, name: &str) -> Station {
        Station {
            id: StationId(id),
            name: name.to_string(),
            address: format!("{name} road"),
            image_url: String::new(),
            latitude: 6.13,
            longitude: 1.21,
            distance_km: 0.0,
        }
    }

    fn test_cache(dir: &TempDir) -> StationCache {
        StationCache::new(StationCacheConfig::new(dir.path().join("stations.json")))
    }

    #[tokio::test]
    async fn online_snapshot_is_emitted_and_cached() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        let source = Arc::new(MockStationSource::with_snapshot(vec![
            record(1, "Total Tokoin"),
            record(2, "Shell Bè"),
        ]));
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(source, cache.clone(), connectivity);

        let stations = feed.recv().await.unwrap().unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(cache.load().unwrap(), stations);
    }

    #[tokio::test]
    async fn empty_snapshot_succeeds_without_touching_cache() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        cache.save(&[station(9, "Oando")]).unwrap();

        let source = Arc::new(MockStationSource::with_snapshot(Vec::new()));
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(source, cache.clone(), connectivity);

        let stations = feed.recv().await.unwrap().unwrap();
        assert!(stations.is_empty());
        // The prior cache contents survive.
        assert_eq!(cache.load().unwrap(), vec![station(9, "Oando")]);
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::with_snapshot(vec![
            record(1, "Total Tokoin"),
            json!({ "id": "not a number", "name": "broken" }),
            record(2, "Shell Bè"),
        ]));
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(source, test_cache(&dir), connectivity);

        let stations = feed.recv().await.unwrap().unwrap();
        let ids: Vec<StationId> = stations.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StationId(1), StationId(2)]);
    }

    #[tokio::test]
    async fn offline_with_cache_serves_cache() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        cache.save(&[station(1, "Total Tokoin")]).unwrap();

        let source = Arc::new(MockStationSource::new());
        let connectivity = Arc::new(SharedConnectivity::new(false));

        let mut feed = spawn_feed(source, cache, connectivity);

        let stations = feed.recv().await.unwrap().unwrap();
        assert_eq!(stations, vec![station(1, "Total Tokoin")]);
    }

    #[tokio::test]
    async fn offline_without_cache_fails() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::new());
        let connectivity = Arc::new(SharedConnectivity::new(false));

        let mut feed = spawn_feed(source, test_cache(&dir), connectivity);

        assert_eq!(
            feed.recv().await.unwrap(),
            Err(PipelineError::NoCachedData)
        );
    }

    #[tokio::test]
    async fn remote_error_falls_back_to_cache() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        cache.save(&[station(1, "Total Tokoin")]).unwrap();

        let source = Arc::new(MockStationSource::new());
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(Arc::clone(&source), cache, connectivity);
        source.push_error("database unreachable");

        let stations = feed.recv().await.unwrap().unwrap();
        assert_eq!(stations, vec![station(1, "Total Tokoin")]);
    }

    #[tokio::test]
    async fn remote_error_without_cache_surfaces_the_error() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::new());
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(Arc::clone(&source), test_cache(&dir), connectivity);
        source.push_error("database unreachable");

        match feed.recv().await.unwrap() {
            Err(PipelineError::RemoteUnavailable { message }) => {
                assert!(message.contains("database unreachable"));
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn regained_connectivity_resubscribes() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::with_snapshot(vec![record(
            1,
            "Total Tokoin",
        )]));
        let connectivity = Arc::new(SharedConnectivity::new(false));

        let mut feed = spawn_feed(Arc::clone(&source), test_cache(&dir), connectivity.clone());

        // Offline with an empty cache: failure first.
        assert_eq!(
            feed.recv().await.unwrap(),
            Err(PipelineError::NoCachedData)
        );

        // Back online: the feed resubscribes on its own and the remote
        // snapshot comes through.
        connectivity.set_available(true);
        let stations = feed.recv().await.unwrap().unwrap();
        assert_eq!(stations, vec![station(1, "Total Tokoin")]);
    }

    #[tokio::test]
    async fn lost_connectivity_serves_cache() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        let source = Arc::new(MockStationSource::with_snapshot(vec![record(
            1,
            "Total Tokoin",
        )]));
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(source, cache, connectivity.clone());

        // Online snapshot arrives and populates the cache.
        assert_eq!(feed.recv().await.unwrap().unwrap().len(), 1);

        connectivity.set_available(false);
        let stations = feed.recv().await.unwrap().unwrap();
        assert_eq!(stations, vec![station(1, "Total Tokoin")]);
    }

    #[tokio::test]
    async fn repeated_snapshots_keep_flowing() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::with_snapshot(vec![record(
            1,
            "Total Tokoin",
        )]));
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let mut feed = spawn_feed(Arc::clone(&source), test_cache(&dir), connectivity);
        assert_eq!(feed.recv().await.unwrap().unwrap().len(), 1);

        source.push_snapshot(vec![record(1, "Total Tokoin"), record(2, "Shell Bè")]);
        assert_eq!(feed.recv().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dropping_the_feed_releases_the_subscription() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockStationSource::new());
        let connectivity = Arc::new(SharedConnectivity::new(true));

        let feed = spawn_feed(Arc::clone(&source), test_cache(&dir), connectivity);
        assert_eq!(source.subscriber_count(), 1);

        drop(feed);
        for _ in 0..100 {
            if source.subscriber_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("remote subscription leaked after feed drop");
    }

    #[test]
    fn parse_records_skips_only_the_bad_ones() {
        let records = vec![
            record(1, "Total Tokoin"),
            json!("not even an object"),
            record(2, "Shell Bè"),
        ];

        let stations = parse_records(&records);
        assert_eq!(stations.len(), 2);
    }
}
