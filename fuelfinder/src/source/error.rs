//! Remote-source error types.

/// Errors reported by a remote station source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The change stream reported a network or server failure.
    #[error("remote source error: {message}")]
    Remote { message: String },

    /// Backing data for a source could not be loaded.
    #[error("source data error: {message}")]
    Data { message: String },
}
