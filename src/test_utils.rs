//! Test utilities and fixtures for playlist-planner tests.
//!
//! This module provides common test helpers, fixture factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use playlist_planner::test_utils::{temp_db, mock_track};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     let track = mock_track("t1", 3);
//!     // ... test logic
//! }
//! ```

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::model::{ArtistRef, FeatureRecord, FeatureSource, PlaylistRecord, TrackEntry};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates a track entry added `days_ago` days before now.
///
/// Title is "Song {id}" by "Artist {id}", three minutes long.
pub fn mock_track(id: &str, days_ago: i64) -> TrackEntry {
    TrackEntry {
        id: id.to_string(),
        added_at: Utc::now() - Duration::days(days_ago),
        name: format!("Song {id}"),
        duration_ms: 180_000,
        artists: vec![ArtistRef {
            id: Some(format!("artist-{id}")),
            name: format!("Artist {id}"),
        }],
    }
}

/// Creates a track entry with an explicit title and artist.
pub fn named_track(id: &str, name: &str, artist: &str) -> TrackEntry {
    TrackEntry {
        name: name.to_string(),
        artists: vec![ArtistRef::named(artist)],
        ..mock_track(id, 30)
    }
}

/// Creates a playlist record.
pub fn mock_playlist(id: &str, name: &str, snapshot: &str, tracks: Vec<TrackEntry>) -> PlaylistRecord {
    PlaylistRecord {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        snapshot_id: snapshot.to_string(),
        track_list: tracks,
    }
}

/// Creates a lookup-service hit with the given tempo.
pub fn mock_features(id: &str, tempo: f64) -> FeatureRecord {
    FeatureRecord {
        id: id.to_string(),
        tempo: Some(tempo),
        energy: None,
        danceability: Some(55.0),
        key: Some("C".to_string()),
        source: FeatureSource::LookupService,
        checked_at: Some(Utc::now()),
    }
}
