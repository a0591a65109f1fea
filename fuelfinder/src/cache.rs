//! Local station cache.
//!
//! Persists the last station list observed from the remote source so the
//! pipeline can keep serving data while the source is unreachable. The
//! validity window is informational only: an expired cache still serves
//! fallback reads, it just reports itself as stale.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Station;

/// Default validity window: 24 hours.
const DEFAULT_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// On-disk cache payload.
#[derive(Debug, Serialize, Deserialize)]
struct CachedStationList {
    /// Unix milliseconds when the cache was written.
    cached_at_ms: i64,
    stations: Vec<Station>,
}

/// Errors from cache reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("cache I/O error: {message}")]
    Io { message: String },

    /// Payload could not be serialized.
    #[error("cache serialization error: {message}")]
    Serialize { message: String },
}

/// Configuration for the station cache.
#[derive(Debug, Clone)]
pub struct StationCacheConfig {
    /// Path to the cache file.
    pub path: PathBuf,
    /// How long cached data is considered fresh.
    pub validity: Duration,
}

impl StationCacheConfig {
    /// Cache config with the given path and the default 24-hour validity.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            validity: DEFAULT_VALIDITY,
        }
    }

    /// Set a custom validity window.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }
}

impl Default for StationCacheConfig {
    fn default() -> Self {
        Self::new("stations_cache.json")
    }
}

/// File-backed cache of the last observed station list.
#[derive(Debug, Clone)]
pub struct StationCache {
    config: StationCacheConfig,
}

impl StationCache {
    /// Create a cache with the given config.
    pub fn new(config: StationCacheConfig) -> Self {
        Self { config }
    }

    /// Load whatever is cached, regardless of age.
    ///
    /// Returns `None` if the cache file is missing or unreadable.
    pub fn load(&self) -> Option<Vec<Station>> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let cached: CachedStationList = serde_json::from_str(&contents).ok()?;
        Some(cached.stations)
    }

    /// Overwrite the cache with `stations`, refreshing the timestamp.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, stations: &[Station]) -> Result<(), CacheError> {
        let cached = CachedStationList {
            cached_at_ms: Utc::now().timestamp_millis(),
            stations: stations.to_vec(),
        };

        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                message: format!("failed to create cache directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(&cached).map_err(|e| CacheError::Serialize {
            message: format!("failed to serialize cache: {}", e),
        })?;

        std::fs::write(&self.config.path, json).map_err(|e| CacheError::Io {
            message: format!("failed to write cache file: {}", e),
        })?;

        Ok(())
    }

    /// When the cache was last written.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let cached: CachedStationList = serde_json::from_str(&contents).ok()?;
        DateTime::from_timestamp_millis(cached.cached_at_ms)
    }

    /// Whether cached data exists and is within the validity window.
    ///
    /// Informational: [`StationCache::load`] ignores this.
    pub fn is_valid(&self) -> bool {
        let Some(updated) = self.last_updated() else {
            return false;
        };

        let age_ms = Utc::now()
            .timestamp_millis()
            .saturating_sub(updated.timestamp_millis())
            .max(0) as u128;
        age_ms < self.config.validity.as_millis()
    }

    /// Whether any readable cached data exists.
    pub fn has_data(&self) -> bool {
        self.load().is_some()
    }

    /// Delete the cache file.
    pub fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.config.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                message: format!("failed to remove cache file: {}", e),
            }),
        }
    }

    /// The cache file path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// The validity window.
    pub fn validity(&self) -> Duration {
        self.config.validity
    }
}
