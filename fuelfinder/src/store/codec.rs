//! Versioned encoding for persisted id lists.
//!
//! Blobs are the version prefix `v1:` followed by comma-joined decimal
//! ids. An unknown version rejects the whole blob; individual tokens that
//! fail to parse are skipped, matching the pipeline's parse-skip policy
//! for malformed records.

use crate::domain::StationId;

const VERSION_PREFIX: &str = "v1:";

/// Error decoding a persisted id list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The blob does not start with a known version prefix.
    #[error("unknown id-list version: {found:?}")]
    UnknownVersion { found: String },
}

/// Encode an ordered id list.
pub fn encode_ids(ids: &[StationId]) -> String {
    let mut out = String::from(VERSION_PREFIX);
    let mut first = true;
    for id in ids {
        if !first {
            out.push(',');
        }
        out.push_str(&id.to_string());
        first = false;
    }
    out
}

/// Decode an id list, preserving order and skipping malformed tokens.
pub fn decode_ids(blob: &str) -> Result<Vec<StationId>, CodecError> {
    let Some(payload) = blob.strip_prefix(VERSION_PREFIX) else {
        return Err(CodecError::UnknownVersion {
            found: blob.chars().take(8).collect(),
        });
    };

    if payload.is_empty() {
        return Ok(Vec::new());
    }

    Ok(payload
        .split(',')
        .filter_map(|token| token.parse::<StationId>().ok())
        .collect())
}
