//! Trait definitions for the tempo lookup service.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses [`GetSongBpmClient`](super::GetSongBpmClient),
//! while tests substitute [`mocks::MockLookup`].

use async_trait::async_trait;

use super::domain::{LookupError, LookupQuery, SongCandidate};

/// Title search against a tempo database.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait FeatureLookup: Send + Sync {
    /// Search by title; results are unfiltered by artist.
    async fn search(&self, query: &LookupQuery) -> Result<Vec<SongCandidate>, LookupError>;
}
