//! Core data models for the planner.
//!
//! Defines the persisted entities ([`PlaylistRecord`], [`FeatureRecord`])
//! and the per-run library view ([`AggregatedTrack`]).
//!
//! # Lifecycle
//!
//! - `PlaylistRecord` is owned by the snapshot cache and only ever replaced
//!   wholesale when the provider's snapshot id changes.
//! - `FeatureRecord` is owned by the feature cache; its `id` never changes.
//! - `AggregatedTrack` lives for a single aggregation run and is never
//!   persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An artist credit on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    /// Provider artist ID (absent for some local/unlinked credits)
    #[serde(default)]
    pub id: Option<String>,
    /// Display name
    pub name: String,
}

impl ArtistRef {
    /// Create an artist credit without a provider ID.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A track as it appears inside one playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    /// Provider track ID
    pub id: String,
    /// When the track was added to the containing playlist
    pub added_at: DateTime<Utc>,
    /// Track title
    pub name: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Credited artists, primary artist first
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

impl TrackEntry {
    /// Name of the first credited artist, or an empty string.
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }

    /// All artist names joined for display.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A cached playlist snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    /// Provider playlist ID
    pub id: String,
    /// Playlist name
    pub name: String,
    /// Playlist description (may be empty)
    #[serde(default)]
    pub description: String,
    /// Provider-issued version token; changes iff the track list changed
    pub snapshot_id: String,
    /// Member tracks in provider order
    #[serde(default)]
    pub track_list: Vec<TrackEntry>,
}

/// Where a feature record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureSource {
    /// The playlist provider's own audio-feature data
    MetadataProvider,
    /// A hit from the external tempo lookup service
    LookupService,
    /// Tombstone: the lookup service was asked and had nothing
    LookupServiceNotFound,
}

impl FeatureSource {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataProvider => "metadata-provider",
            Self::LookupService => "lookup-service",
            Self::LookupServiceNotFound => "lookup-service-not-found",
        }
    }
}

impl std::fmt::Display for FeatureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tempo/energy metadata resolved for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Provider track ID this record describes
    pub id: String,
    /// Beats per minute
    pub tempo: Option<f64>,
    /// Energy (provider scale)
    pub energy: Option<f64>,
    /// Danceability (provider scale)
    pub danceability: Option<f64>,
    /// Musical key, e.g. "C#m"
    pub key: Option<String>,
    /// Origin of this record
    pub source: FeatureSource,
    /// When the lookup happened (always set on tombstones)
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
}

impl FeatureRecord {
    /// Build a "checked, not found" tombstone.
    pub fn not_found(id: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            tempo: None,
            energy: None,
            danceability: None,
            key: None,
            source: FeatureSource::LookupServiceNotFound,
            checked_at: Some(checked_at),
        }
    }

    /// True if this record only suppresses repeat lookups.
    pub fn is_tombstone(&self) -> bool {
        self.source == FeatureSource::LookupServiceNotFound
    }

    /// Tempo usable for display; tombstones never carry one.
    pub fn playable_tempo(&self) -> Option<f64> {
        if self.is_tombstone() { None } else { self.tempo }
    }
}

/// One appearance of a library track inside a class playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    /// Name of the class playlist
    pub playlist: String,
    /// The entry as it appears in that playlist
    pub entry: TrackEntry,
    /// Age-bucket weight of this single occurrence
    pub recency_weight: u32,
}

/// A library-level track produced by one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTrack {
    /// Base fields from the first library occurrence
    pub track: TrackEntry,
    /// Library playlists containing this track, in first-seen order
    pub lists: Vec<String>,
    /// Class playlist appearances
    pub plays: Vec<Play>,
    /// Sum of the per-play recency weights
    pub recency_score: u32,
    /// Resolved features, if any are cached
    pub audio_features: Option<FeatureRecord>,
}

impl AggregatedTrack {
    /// Seed an aggregated track from its first library occurrence.
    pub fn seed(entry: TrackEntry, playlist: &str) -> Self {
        Self {
            track: entry,
            lists: vec![playlist.to_string()],
            plays: Vec::new(),
            recency_score: 0,
            audio_features: None,
        }
    }

    /// Track ID.
    pub fn id(&self) -> &str {
        &self.track.id
    }

    /// Most recent class appearance, if any.
    pub fn last_played(&self) -> Option<DateTime<Utc>> {
        self.plays.iter().map(|p| p.entry.added_at).max()
    }

    /// True if the feature cache has no record at all for this track.
    pub fn needs_features(&self) -> bool {
        self.audio_features.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> TrackEntry {
        TrackEntry {
            id: "t1".to_string(),
            added_at: Utc::now(),
            name: "Song".to_string(),
            duration_ms: 180_000,
            artists: vec![ArtistRef::named("First"), ArtistRef::named("Second")],
        }
    }

    #[test]
    fn test_primary_artist() {
        let e = entry();
        assert_eq!(e.primary_artist(), "First");
        assert_eq!(e.artist_names(), "First, Second");

        let lonely = TrackEntry {
            artists: vec![],
            ..entry()
        };
        assert_eq!(lonely.primary_artist(), "");
    }

    #[test]
    fn test_tombstone_has_no_playable_tempo() {
        let mut tomb = FeatureRecord::not_found("t1", Utc::now());
        assert!(tomb.is_tombstone());
        assert!(tomb.checked_at.is_some());

        // Even a stray tempo value on a tombstone is not exposed
        tomb.tempo = Some(120.0);
        assert_eq!(tomb.playable_tempo(), None);
    }

    #[test]
    fn test_feature_source_serializes_kebab_case() {
        let json = serde_json::to_string(&FeatureSource::LookupServiceNotFound).unwrap();
        assert_eq!(json, "\"lookup-service-not-found\"");
        assert_eq!(FeatureSource::MetadataProvider.as_str(), "metadata-provider");
    }

    #[test]
    fn test_playlist_record_tolerates_missing_optional_fields() {
        let json = r#"{"id":"p1","name":"Aggregated Cycle","snapshot_id":"s1"}"#;
        let record: PlaylistRecord = serde_json::from_str(json).unwrap();
        assert!(record.description.is_empty());
        assert!(record.track_list.is_empty());
    }

    #[test]
    fn test_seed_aggregated_track() {
        let agg = AggregatedTrack::seed(entry(), "Library A");
        assert_eq!(agg.id(), "t1");
        assert_eq!(agg.lists, vec!["Library A".to_string()]);
        assert_eq!(agg.recency_score, 0);
        assert!(agg.plays.is_empty());
        assert!(agg.needs_features());
        assert_eq!(agg.last_played(), None);
    }
}
