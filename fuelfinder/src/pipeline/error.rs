//! Pipeline failure conditions.

/// Failures surfaced by the reconciliation feed.
///
/// Two conditions never appear here: individual malformed records are
/// logged and skipped, and location problems substitute the default
/// coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The remote stream failed and the cache had nothing to serve.
    #[error("remote source unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// Offline with no cached data.
    #[error("offline and no cached data available")]
    NoCachedData,
}
