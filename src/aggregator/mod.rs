//! Library aggregation and recency scoring.
//!
//! Merges the library playlists into one deduplicated track set and folds
//! in class-playlist appearances:
//!
//! 1. Library playlists are walked in the order supplied; the first
//!    occurrence of a track id provides its base fields, later occurrences
//!    only add their playlist name to `lists`.
//! 2. Every class-playlist entry matching a library track becomes a
//!    [`Play`] stamped with its [`recency_weight`]; the weights are summed
//!    into `recency_score`.
//! 3. The result is sorted by ascending score, ties broken by the most
//!    recently added library entry first.
//!
//! Tracks that only appear in class playlists are not surfaced.

mod recency;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{AggregatedTrack, FeatureRecord, Play, PlaylistRecord, TrackEntry};

pub use recency::{RECENCY_BUCKETS, recency_weight};

/// Malformed playlist data that stops an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("Track at position {position} of playlist '{playlist}' has no id")]
    MissingTrackId { playlist: String, position: usize },

    #[error("Two library playlists are both named '{0}'")]
    DuplicateLibraryName(String),
}

/// Aggregate library and class playlists as of `now`.
///
/// Either the whole ranked list is returned or an error; nothing partial.
pub fn aggregate(
    library: &[PlaylistRecord],
    classes: &[PlaylistRecord],
    now: DateTime<Utc>,
) -> Result<Vec<AggregatedTrack>, AggregateError> {
    validate(library)?;
    validate(classes)?;
    unique_names(library)?;

    let mut tracks = merge_library(library);
    let appearances = index_appearances(classes);

    for track in &mut tracks {
        let Some(found) = appearances.get(track.track.id.as_str()) else {
            continue;
        };
        for (playlist, entry) in found {
            let weight = recency_weight(entry.added_at, now);
            track.recency_score += weight;
            track.plays.push(Play {
                playlist: (*playlist).to_string(),
                entry: (*entry).clone(),
                recency_weight: weight,
            });
        }
    }

    rank(&mut tracks);

    tracing::debug!(
        tracks = tracks.len(),
        library_playlists = library.len(),
        class_playlists = classes.len(),
        "Aggregated library"
    );
    Ok(tracks)
}

/// Attach cached feature records to the matching tracks.
///
/// Tracks with no record keep `audio_features = None`.
pub fn attach_features(tracks: &mut [AggregatedTrack], features: &HashMap<String, FeatureRecord>) {
    for track in tracks {
        if let Some(record) = features.get(track.id()) {
            track.audio_features = Some(record.clone());
        }
    }
}

fn validate(playlists: &[PlaylistRecord]) -> Result<(), AggregateError> {
    for playlist in playlists {
        if let Some(position) = playlist.track_list.iter().position(|t| t.id.trim().is_empty()) {
            return Err(AggregateError::MissingTrackId {
                playlist: playlist.name.clone(),
                position,
            });
        }
    }
    Ok(())
}

/// `lists` holds names, so library names must tell playlists apart.
fn unique_names(library: &[PlaylistRecord]) -> Result<(), AggregateError> {
    let mut seen = std::collections::HashSet::new();
    for playlist in library {
        if !seen.insert(playlist.name.as_str()) {
            return Err(AggregateError::DuplicateLibraryName(playlist.name.clone()));
        }
    }
    Ok(())
}

/// One owned track per id, in first-seen order.
fn merge_library(library: &[PlaylistRecord]) -> Vec<AggregatedTrack> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut tracks: Vec<AggregatedTrack> = Vec::new();

    for playlist in library {
        for entry in &playlist.track_list {
            match slots.get(entry.id.as_str()) {
                Some(&slot) => {
                    let lists = &mut tracks[slot].lists;
                    if !lists.iter().any(|name| name == &playlist.name) {
                        lists.push(playlist.name.clone());
                    }
                }
                None => {
                    slots.insert(entry.id.as_str(), tracks.len());
                    tracks.push(AggregatedTrack::seed(entry.clone(), &playlist.name));
                }
            }
        }
    }

    tracks
}

/// Class appearances by track id, in class-playlist then entry order.
fn index_appearances(classes: &[PlaylistRecord]) -> HashMap<&str, Vec<(&str, &TrackEntry)>> {
    let mut index: HashMap<&str, Vec<(&str, &TrackEntry)>> = HashMap::new();
    for playlist in classes {
        for entry in &playlist.track_list {
            index
                .entry(entry.id.as_str())
                .or_default()
                .push((playlist.name.as_str(), entry));
        }
    }
    index
}

/// Ascending score, newest library addition first among equals. Stable.
fn rank(tracks: &mut [AggregatedTrack]) {
    tracks.sort_by(|a, b| {
        a.recency_score
            .cmp(&b.recency_score)
            .then_with(|| b.track.added_at.cmp(&a.track.added_at))
    });
}
