//! Demo: run the pipeline against a mock source and print the result.
//!
//! Pass a path to a JSON array of station records to serve it as the
//! remote snapshot; without arguments a built-in sample list is used.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use fuelfinder::cache::{StationCache, StationCacheConfig};
use fuelfinder::connectivity::SharedConnectivity;
use fuelfinder::location::{FixedLocationProvider, resolve_coordinate};
use fuelfinder::pipeline::{process, spawn_feed};
use fuelfinder::prefs::{Favorites, VisitHistory};
use fuelfinder::source::MockStationSource;
use fuelfinder::store::FileStore;

fn sample_records() -> Vec<serde_json::Value> {
    vec![
        json!({
            "id": 1,
            "name": "Total Tokoin",
            "address": "Boulevard du 13 Janvier, Lomé",
            "imageUrl": "https://example.com/total-tokoin.jpg",
            "latitude": 6.1375,
            "longitude": 1.2123,
        }),
        json!({
            "id": 2,
            "name": "Shell Bè",
            "address": "Rue du Grand Marché, Lomé",
            "imageUrl": "https://example.com/shell-be.jpg",
            "latitude": 6.1250,
            "longitude": 1.2400,
        }),
        json!({
            "id": 3,
            "name": "Oando Agoè",
            "address": "Route d'Atakpamé, Agoè",
            "imageUrl": "https://example.com/oando-agoe.jpg",
            "latitude": 6.2300,
            "longitude": 1.2150,
        }),
    ]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let source = match std::env::args().nth(1) {
        Some(path) => MockStationSource::from_file(&path).expect("failed to load station file"),
        None => MockStationSource::with_snapshot(sample_records()),
    };
    let source = Arc::new(source);

    let cache = StationCache::new(StationCacheConfig::new("data/stations_cache.json"));
    let connectivity = Arc::new(SharedConnectivity::new(true));

    let store = Arc::new(FileStore::new("data/prefs"));
    let history = VisitHistory::load(Arc::clone(&store)).expect("failed to load visit history");
    let favorites = Favorites::load(store).expect("failed to load favorites");

    // No real location service here: fall back to the default coordinate.
    let reference =
        resolve_coordinate(&FixedLocationProvider::denied(), Duration::from_secs(30)).await;
    println!("Reference point: {reference}");
    println!();

    let mut feed = spawn_feed(source, cache, connectivity);
    let stations = match feed.recv().await.expect("feed closed unexpectedly") {
        Ok(stations) => stations,
        Err(e) => {
            eprintln!("No station data available: {e}");
            return;
        }
    };

    history.reattach(&stations);
    favorites.reattach(&stations);

    let views = process(&stations, Some(reference), "", &favorites.ids());
    println!("{} stations, nearest first:", views.len());
    for view in &views {
        let marker = if view.is_favorite { "*" } else { " " };
        println!(
            " {marker} {:<16} {:>9}  {}",
            view.station.name,
            view.station.formatted_distance(),
            view.station.address
        );
    }
}
