//! Persistent caches backing the planner.
//!
//! - [`SnapshotCache`] - playlist records with snapshot-id change detection
//! - [`FeatureCache`] - tempo/energy records keyed by track id, including
//!   "checked, not found" tombstones
//!
//! Both are thin wrappers over a shared [`SqlitePool`](sqlx::SqlitePool) and
//! store their records as JSON blobs. A blob that no longer decodes is
//! reported as [`CacheError::Corrupt`], never as a missing entry.

mod features;
mod snapshot;

pub use features::{FeatureCache, FeatureStats};
pub use snapshot::{SnapshotCache, UpsertReport};

/// Errors from cache reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Storage unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt cache entry {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode cache entry {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            key: key.into(),
            source,
        }
    }

    pub(crate) fn encode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            key: key.into(),
            source,
        }
    }
}
