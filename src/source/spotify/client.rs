//! Spotify Web API HTTP client
//!
//! Handles the three read endpoints the planner needs:
//! - `GET /me/playlists` - the user's playlists (paged)
//! - `GET /playlists/{id}/tracks` - a playlist's members (paged)
//! - `GET /audio-features?ids=` - tempo/energy for up to 100 tracks
//!
//! Status handling: 401 means the bearer token is no good, 429 means back
//! off and retry the same request; anything else non-2xx is an API error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::model::{FeatureRecord, TrackEntry};
use crate::source::{CredentialProvider, Page, PageRequest, PlaylistSource, PlaylistSummary, SourceError};

/// The audio-features endpoint accepts at most this many ids per call.
pub const MAX_FEATURE_IDS: usize = 100;

/// Spotify Web API client
pub struct SpotifyClient {
    credentials: Arc<dyn CredentialProvider>,
    http_client: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    /// Create a new client backed by the given credential provider.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, SourceError> {
        Self::with_base_url(credentials, "https://api.spotify.com/v1")
    }

    /// Create a client against a custom base URL (proxies, tests).
    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            credentials,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn playlists_url(&self, page: PageRequest) -> String {
        format!("{}/me/playlists?limit={}&offset={}", self.base_url, page.limit, page.offset)
    }

    fn tracks_url(&self, playlist_id: &str, page: PageRequest) -> String {
        format!(
            "{}/playlists/{}/tracks?limit={}&offset={}",
            self.base_url,
            urlencoding::encode(playlist_id),
            page.limit,
            page.offset
        )
    }

    fn features_url(&self, ids: &[String]) -> String {
        format!("{}/audio-features?ids={}", self.base_url, urlencoding::encode(&ids.join(",")))
    }

    /// Send an authorized GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let token = self.credentials.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SourceError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !status.is_success() {
            if let Ok(error) = response.json::<dto::ErrorResponse>().await {
                return Err(SourceError::Api(format!(
                    "HTTP {}: {}",
                    error.error.status, error.error.message
                )));
            }
            return Err(SourceError::Api(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn list_playlists(&self, page: PageRequest) -> Result<Page<PlaylistSummary>, SourceError> {
        let paging: dto::Paging<dto::SimplifiedPlaylist> = self.get_json(&self.playlists_url(page)).await?;
        Ok(adapter::to_playlist_page(paging))
    }

    async fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        page: PageRequest,
    ) -> Result<Page<TrackEntry>, SourceError> {
        let paging: dto::Paging<dto::PlaylistTrackItem> =
            self.get_json(&self.tracks_url(playlist_id, page)).await?;
        Ok(adapter::to_track_page(paging))
    }

    async fn audio_features(&self, track_ids: &[String]) -> Result<Vec<FeatureRecord>, SourceError> {
        let mut records = Vec::with_capacity(track_ids.len());
        for chunk in track_ids.chunks(MAX_FEATURE_IDS) {
            let response: dto::AudioFeaturesResponse = self.get_json(&self.features_url(chunk)).await?;
            records.extend(adapter::to_feature_records(response, Utc::now()));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticToken;

    fn client() -> SpotifyClient {
        SpotifyClient::with_base_url(Arc::new(StaticToken::new("token")), "http://localhost:9/v1/").unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = SpotifyClient::new(Arc::new(StaticToken::new("token"))).unwrap();
        assert_eq!(client.base_url, "https://api.spotify.com/v1");
    }

    #[test]
    fn test_urls() {
        let c = client();
        assert_eq!(
            c.playlists_url(PageRequest { offset: 50, limit: 50 }),
            "http://localhost:9/v1/me/playlists?limit=50&offset=50"
        );
        assert_eq!(
            c.tracks_url("abc", PageRequest::first(20)),
            "http://localhost:9/v1/playlists/abc/tracks?limit=20&offset=0"
        );
        assert_eq!(
            c.features_url(&["a".to_string(), "b".to_string()]),
            "http://localhost:9/v1/audio-features?ids=a%2Cb"
        );
    }

    #[tokio::test]
    async fn test_empty_token_fails_before_network() {
        let c = SpotifyClient::with_base_url(Arc::new(StaticToken::new("")), "http://localhost:9").unwrap();
        let err = c.list_playlists(PageRequest::first(50)).await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized));
    }
}
