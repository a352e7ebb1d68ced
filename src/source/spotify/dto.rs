//! Spotify Web API Data Transfer Objects
//!
//! These types match what the Spotify Web API returns for the endpoints we
//! call. DO NOT use these types outside the spotify module - convert to
//! domain types via the adapter.
//!
//! API Reference: https://developer.spotify.com/documentation/web-api
//!
//! Example playlist-tracks page:
//! ```json
//! {
//!   "items": [{
//!     "added_at": "2024-01-05T18:00:00Z",
//!     "track": {
//!       "id": "4uLU6hMCjMI75M1A2tKUQC",
//!       "name": "Song",
//!       "duration_ms": 213000,
//!       "artists": [{"id": "0OdUWJ0sBjDrqHygGUXeCF", "name": "Artist"}]
//!     }
//!   }],
//!   "next": null, "offset": 0, "limit": 50, "total": 1
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic paging object wrapping every list endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// URL of the next page, null on the last one
    pub next: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u32,
}

/// Playlist as returned by `GET /me/playlists`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub snapshot_id: String,
    pub public: Option<bool>,
    pub tracks: Option<TracksRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TracksRef {
    pub total: u32,
}

/// One row of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistTrackItem {
    /// Null for very old playlists
    pub added_at: Option<DateTime<Utc>>,
    /// Null when the track was removed from the catalog
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackObject {
    /// Null for local files
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: String,
}

/// Response of `GET /audio-features?ids=...`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioFeaturesResponse {
    /// Null entries for ids without analysis
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioFeatures {
    pub id: String,
    pub tempo: Option<f64>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    /// Pitch class, -1 when undetected
    pub key: Option<i32>,
    /// 1 = major, 0 = minor
    pub mode: Option<i32>,
}

/// Error body: `{"error": {"status": 401, "message": "..."}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_parse_playlists_page() {
        let json = r#"{
            "href": "https://api.spotify.com/v1/me/playlists?offset=0&limit=50",
            "items": [{
                "collaborative": false,
                "description": "Library pool",
                "id": "37i9dQZF1DXcBWIGoYBM5M",
                "name": "Aggregated Cycle",
                "public": true,
                "snapshot_id": "MTY4NzQ0MzY3Nyw",
                "tracks": {"href": "https://api.spotify.com/v1/playlists/x/tracks", "total": 312},
                "type": "playlist"
            }],
            "limit": 50,
            "next": "https://api.spotify.com/v1/me/playlists?offset=50&limit=50",
            "offset": 0,
            "previous": null,
            "total": 73
        }"#;

        let page: Paging<SimplifiedPlaylist> = serde_json::from_str(json).expect("playlists page");
        assert_eq!(page.total, 73);
        assert!(page.next.is_some());
        assert_eq!(page.items[0].name, "Aggregated Cycle");
        assert_eq!(page.items[0].tracks.as_ref().map(|t| t.total), Some(312));
    }

    #[test]
    fn test_parse_tracks_page_with_local_and_removed_items() {
        let json = r#"{
            "items": [
                {"added_at": "2024-01-05T18:00:00Z", "track": {
                    "id": "abc", "name": "Song", "duration_ms": 213000, "is_local": false,
                    "artists": [{"id": "a1", "name": "Artist"}]
                }},
                {"added_at": "2024-01-05T18:01:00Z", "track": {
                    "id": null, "name": "Demo.mp3", "duration_ms": 0, "is_local": true,
                    "artists": [{"id": null, "name": ""}]
                }},
                {"added_at": null, "track": null}
            ],
            "next": null, "offset": 0, "limit": 50, "total": 3
        }"#;

        let page: Paging<PlaylistTrackItem> = serde_json::from_str(json).expect("tracks page");
        assert_eq!(page.items.len(), 3);
        assert!(page.items[1].track.as_ref().unwrap().is_local);
        assert!(page.items[2].track.is_none());
        assert!(page.items[2].added_at.is_none());
    }

    #[test]
    fn test_parse_audio_features_with_nulls() {
        let json = r#"{"audio_features": [
            {"id": "abc", "tempo": 118.2, "energy": 0.8, "danceability": 0.6, "key": 1, "mode": 0},
            null
        ]}"#;
        let resp: AudioFeaturesResponse = serde_json::from_str(json).expect("features");
        assert_eq!(resp.audio_features.len(), 2);
        assert!(resp.audio_features[1].is_none());
    }

    #[test]
    fn test_parse_error_body() {
        let json = r#"{"error": {"status": 401, "message": "The access token expired"}}"#;
        let resp: ErrorResponse = serde_json::from_str(json).expect("error body");
        assert_eq!(resp.error.status, 401);
    }
}
