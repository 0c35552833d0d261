//! Error types for the panel engine.
//!
//! Fetch failures propagate to the page that asked for the data. Persistence
//! failures never leave `ColumnStateStore`; they are logged and replaced by
//! default state.

use thiserror::Error;

use crate::traits::RecordKey;

/// Failure reported by a root or child fetch collaborator.
///
/// `Clone` because a single coalesced fetch result is handed to every caller
/// waiting on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {message}")]
    Decode { message: String },
}

/// Failure of the durable key/value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Persisted column state that could not be decoded.
#[derive(Debug, Error)]
pub enum PersistenceCorruptError {
    #[error("malformed column state under {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("column state under {key} has unsupported version {found}")]
    UnsupportedVersion { key: String, found: u32 },
}

/// Errors surfaced to pages driving a tree or table panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("fetch failed for {}: {source}", fetch_target(.key))]
    Fetch {
        /// Node whose children were requested, `None` for a root search.
        key: Option<RecordKey>,
        #[source]
        source: FetchError,
    },

    #[error("node {key} is not part of the current forest")]
    NodeNotFound { key: RecordKey },

    #[error("response for {target} was superseded by a newer request")]
    Superseded { target: String },
}

fn fetch_target(key: &Option<RecordKey>) -> &str {
    key.as_deref().unwrap_or("root search")
}

impl PanelError {
    /// True when the error is a dropped stale response rather than a failure
    /// worth showing to the user.
    pub fn is_superseded(&self) -> bool {
        matches!(self, PanelError::Superseded { .. })
    }
}
