//! Internal domain models for tempo lookups.
//!
//! These types are OUR types - they don't change when the lookup API changes.
//! Responses get converted into these types via the adapter.

use chrono::{DateTime, Utc};

use crate::model::{FeatureRecord, FeatureSource, TrackEntry};

/// What we ask the lookup service about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// Track title as stored (cleaned before it goes on the wire)
    pub title: String,
    /// Primary artist name
    pub artist: String,
}

impl LookupQuery {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Query for a playlist entry: its title and first credited artist.
    pub fn for_track(track: &TrackEntry) -> Self {
        Self::new(track.name.clone(), track.primary_artist())
    }
}

/// One search result from the lookup service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongCandidate {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub tempo: Option<f64>,
    pub key: Option<String>,
    pub time_signature: Option<String>,
    pub danceability: Option<f64>,
    pub acousticness: Option<f64>,
}

impl SongCandidate {
    /// Feature record for `track_id` built from this match.
    pub fn to_feature_record(&self, track_id: &str, checked_at: DateTime<Utc>) -> FeatureRecord {
        FeatureRecord {
            id: track_id.to_string(),
            tempo: self.tempo,
            // The search endpoint carries no energy value
            energy: None,
            danceability: self.danceability,
            key: self.key.clone(),
            source: FeatureSource::LookupService,
            checked_at: Some(checked_at),
        }
    }
}

/// Errors from the tempo lookup service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup API key is invalid or inactive")]
    Unauthorized,

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Lookup API key not configured (set GETSONGBPM_API_KEY)")]
    MissingCredential,
}

impl LookupError {
    /// True if no further request with this credential can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::named_track;

    #[test]
    fn test_query_uses_primary_artist() {
        let mut track = named_track("t1", "Yesterday", "The Beatles");
        track.artists.push(crate::model::ArtistRef::named("Someone Else"));
        let query = LookupQuery::for_track(&track);
        assert_eq!(query, LookupQuery::new("Yesterday", "The Beatles"));
    }

    #[test]
    fn test_candidate_to_record() {
        let candidate = SongCandidate {
            title: "Yesterday".to_string(),
            artist: "The Beatles".to_string(),
            tempo: Some(97.0),
            key: Some("F".to_string()),
            danceability: Some(33.0),
            ..Default::default()
        };
        let record = candidate.to_feature_record("t1", Utc::now());
        assert_eq!(record.id, "t1");
        assert_eq!(record.source, FeatureSource::LookupService);
        assert_eq!(record.playable_tempo(), Some(97.0));
        assert_eq!(record.key.as_deref(), Some("F"));
    }

    #[test]
    fn test_fatal_errors() {
        assert!(LookupError::Unauthorized.is_fatal());
        assert!(LookupError::MissingCredential.is_fatal());
        assert!(!LookupError::RateLimited.is_fatal());
        assert!(!LookupError::Network("timeout".into()).is_fatal());
    }
}
