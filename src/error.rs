//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`CacheError`], [`AggregateError`],
//!   [`SourceError`]) for detailed handling
//!
//! Lookup failures never reach this type: the enrichment worker turns
//! them into counters or a fatal condition on its status.
//!
//! [`CacheError`]: crate::cache::CacheError
//! [`AggregateError`]: crate::aggregator::AggregateError
//! [`SourceError`]: crate::source::SourceError

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Snapshot or feature cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    /// Malformed playlist data stopped an aggregation run
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] crate::aggregator::AggregateError),

    /// Playlist source failure
    #[error("Playlist source error: {0}")]
    Source(#[from] crate::source::SourceError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, crate::cache::CacheError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Cache(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, crate::source::SourceError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Source(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregateError;
    use crate::source::SourceError;

    #[test]
    fn test_error_display() {
        let err = Error::from(SourceError::NotFound("37i9dQ".to_string()));
        assert!(err.to_string().contains("37i9dQ"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::from(AggregateError::MissingTrackId {
            playlist: "Aggregated Cycle".to_string(),
            position: 3,
        })
        .context("while building library");
        let msg = err.to_string();
        assert!(msg.contains("while building library"));
        assert!(msg.contains("Aggregated Cycle"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), SourceError> = Err(SourceError::RateLimited);
        let err = result.with_context("Failed to list playlists").unwrap_err();
        assert!(err.to_string().contains("Failed to list playlists"));
        assert!(matches!(err, Error::WithContext { ref source, .. } if matches!(**source, Error::Source(_))));
    }
}
