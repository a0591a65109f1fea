//! User geolocation.
//!
//! A location fix is best-effort only: permission denial, a missing fix,
//! or a slow lookup all fall back to a fixed default coordinate, and no
//! location problem ever surfaces to the pipeline as an error.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::Coordinate;

/// Fallback coordinate when no fix is available: Lomé, Togo.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    latitude: 6.1375,
    longitude: 1.2123,
};

/// How long to wait for a location fix before falling back.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Access to the platform location service.
pub trait LocationProvider {
    /// Whether the user has granted location access.
    fn has_permission(&self) -> bool;

    /// Best-known current coordinate, or `None` if no fix is available.
    ///
    /// May suspend while a fresh fix is requested; callers bound the wait
    /// with [`resolve_coordinate`]. Dropping the returned future must
    /// cancel any in-flight fix request.
    fn current_coordinate(&self) -> impl Future<Output = Option<Coordinate>> + Send;

    /// Fixed fallback coordinate.
    fn default_coordinate(&self) -> Coordinate {
        DEFAULT_COORDINATE
    }
}

/// Resolve the coordinate to use as the distance reference point.
///
/// Waits at most `timeout` for a fix, then substitutes the provider's
/// default. Timing out drops the in-flight lookup.
pub async fn resolve_coordinate<P: LocationProvider>(provider: &P, timeout: Duration) -> Coordinate {
    if !provider.has_permission() {
        debug!("location permission not granted, using default coordinate");
        return provider.default_coordinate();
    }

    match tokio::time::timeout(timeout, provider.current_coordinate()).await {
        Ok(Some(coordinate)) => {
            debug!(%coordinate, "location fix obtained");
            coordinate
        }
        Ok(None) => {
            debug!("no location fix available, using default coordinate");
            provider.default_coordinate()
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "location lookup timed out, using default coordinate"
            );
            provider.default_coordinate()
        }
    }
}

/// Location provider with a fixed answer, for tests and hosts without a
/// real location service.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinate: Option<Coordinate>,
    permission: bool,
}

impl FixedLocationProvider {
    /// Permission granted, fix available.
    pub fn granted(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
            permission: true,
        }
    }

    /// Permission granted but no fix obtainable.
    pub fn without_fix() -> Self {
        Self {
            coordinate: None,
            permission: true,
        }
    }

    /// Permission denied.
    pub fn denied() -> Self {
        Self {
            coordinate: None,
            permission: false,
        }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn has_permission(&self) -> bool {
        self.permission
    }

    fn current_coordinate(&self) -> impl Future<Output = Option<Coordinate>> + Send {
        std::future::ready(self.coordinate)
    }
}
