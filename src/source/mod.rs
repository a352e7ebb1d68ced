//! Playlist source - paginated access to a user's playlists.
//!
//! # Architecture
//!
//! - [`PlaylistSource`] - trait seam over the provider (mockable in tests)
//! - [`CredentialProvider`] - yields a bearer token; the OAuth flow itself
//!   lives outside this crate
//! - [`spotify`] - HTTP client, wire DTOs and adapters for the Spotify Web API
//! - [`classify`] - library/class role detection from names and descriptions
//! - [`fetch_all_playlists`] / [`fetch_all_tracks`] - sequential page walkers
//!   that sleep and retry the same page when rate limited

pub mod classify;
pub mod spotify;

use std::time::Duration;

use async_trait::async_trait;

use crate::model::{FeatureRecord, TrackEntry};

pub use classify::{PlaylistRole, PlaylistRules};

/// Errors reported by a playlist source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Access token rejected")]
    Unauthorized,

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Gave up after {0} rate-limited attempts")]
    RetriesExhausted(u32),
}

/// Which slice of a paginated listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

/// One page of results plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when this was the last page
    pub next: Option<PageRequest>,
    /// Total across all pages, when the provider reports it
    pub total: Option<u32>,
}

/// Playlist header as listed by the provider (no tracks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub snapshot_id: String,
    /// `None` when the provider doesn't say
    pub public: Option<bool>,
    pub track_count: u32,
}

/// Source of bearer tokens for the playlist provider.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SourceError>;
}

/// A fixed, externally obtained access token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SourceError> {
        if self.0.is_empty() {
            return Err(SourceError::Unauthorized);
        }
        Ok(self.0.clone())
    }
}

/// Paginated playlist listing.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// One page of the current user's playlists.
    async fn list_playlists(&self, page: PageRequest) -> Result<Page<PlaylistSummary>, SourceError>;

    /// One page of a playlist's member tracks.
    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        page: PageRequest,
    ) -> Result<Page<TrackEntry>, SourceError>;

    /// Provider-side audio features; sources without them return nothing.
    async fn audio_features(&self, _track_ids: &[String]) -> Result<Vec<FeatureRecord>, SourceError> {
        Ok(Vec::new())
    }
}

/// How page walkers react to rate limiting.
#[derive(Debug, Clone, Copy)]
pub struct PageRetry {
    /// Fixed pause before retrying the same page
    pub pause: Duration,
    /// Rate-limited attempts allowed per page
    pub max_attempts: u32,
}

impl Default for PageRetry {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

/// Walk every page of the user's playlists.
pub async fn fetch_all_playlists(
    source: &dyn PlaylistSource,
    page_size: u32,
    retry: PageRetry,
) -> Result<Vec<PlaylistSummary>, SourceError> {
    walk_pages(page_size, retry, move |page| source.list_playlists(page)).await
}

/// Walk every page of one playlist's tracks.
pub async fn fetch_all_tracks(
    source: &dyn PlaylistSource,
    playlist_id: &str,
    page_size: u32,
    retry: PageRetry,
) -> Result<Vec<TrackEntry>, SourceError> {
    walk_pages(page_size, retry, move |page| {
        source.list_playlist_tracks(playlist_id, page)
    })
    .await
}

async fn walk_pages<T, F, Fut>(page_size: u32, retry: PageRetry, mut fetch: F) -> Result<Vec<T>, SourceError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T>, SourceError>>,
{
    let mut items = Vec::new();
    let mut request = Some(PageRequest::first(page_size));
    let mut limited = 0;

    while let Some(page) = request {
        match fetch(page).await {
            Ok(result) => {
                limited = 0;
                items.extend(result.items);
                request = result.next;
            }
            Err(SourceError::RateLimited) => {
                limited += 1;
                if limited >= retry.max_attempts {
                    return Err(SourceError::RetriesExhausted(limited));
                }
                tracing::warn!(
                    "Rate limited at offset {}, retrying in {:?}",
                    page.offset,
                    retry.pause
                );
                tokio::time::sleep(retry.pause).await;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(items)
}
