//! Ranked library view over the caches, plus display helpers.

use chrono::{DateTime, Utc};

use crate::aggregator::{aggregate, attach_features};
use crate::cache::{FeatureCache, SnapshotCache};
use crate::error::{Result, ResultExt};
use crate::model::{AggregatedTrack, PlaylistRecord, TrackEntry};
use crate::source::PlaylistRules;

/// How far a track may be from a duration filter and still match.
pub const DURATION_TOLERANCE_MS: u64 = 5_000;

/// One aggregation run with its known features attached.
#[derive(Debug, Clone, Default)]
pub struct Library {
    /// Ranked tracks
    pub tracks: Vec<AggregatedTrack>,
    pub library_playlists: usize,
    pub class_playlists: usize,
}

impl Library {
    /// Tracks with no cached feature record, in ranked order (the enrichment queue).
    pub fn missing_tracks(&self) -> Vec<TrackEntry> {
        self.tracks
            .iter()
            .filter(|t| t.needs_features())
            .map(|t| t.track.clone())
            .collect()
    }

    /// Re-read features from the cache, e.g. while enrichment is filling it.
    pub async fn refresh_features(&mut self, features: &FeatureCache) -> Result<()> {
        let ids: Vec<&str> = self.tracks.iter().map(|t| t.id()).collect();
        let known = features.get_many(&ids).await?;
        attach_features(&mut self.tracks, &known);
        Ok(())
    }
}

/// Aggregate the cached playlists as of `now` and attach cached features.
///
/// Reads only the caches; nothing here touches the network.
pub async fn build_library(
    snapshots: &SnapshotCache,
    features: &FeatureCache,
    rules: &PlaylistRules,
    now: DateTime<Utc>,
) -> Result<Library> {
    let records = snapshots.get_all().await.with_context("Failed to read playlist cache")?;
    let (library, classes) = rules.partition(&records);

    if library.is_empty() {
        tracing::warn!("No library playlists cached; run a sync first");
    }

    let library: Vec<PlaylistRecord> = library.into_iter().cloned().collect();
    let classes: Vec<PlaylistRecord> = classes.into_iter().cloned().collect();

    let mut tracks = aggregate(&library, &classes, now)?;

    let ids: Vec<&str> = tracks.iter().map(|t| t.id()).collect();
    let known = features.get_many(&ids).await.with_context("Failed to read feature cache")?;
    attach_features(&mut tracks, &known);

    Ok(Library {
        tracks,
        library_playlists: library.len(),
        class_playlists: classes.len(),
    })
}

/// `m:ss`, rounded to the nearest second.
pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = (duration_ms + 500) / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Parse `m:ss` into milliseconds.
pub fn parse_duration(text: &str) -> Option<u64> {
    let (minutes, seconds) = text.trim().split_once(':')?;
    if seconds.len() != 2 {
        return None;
    }
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)?.checked_mul(1000)
}

/// Duration filter as typed by a user.
///
/// `m:ss` matches within [`DURATION_TOLERANCE_MS`]; anything else matches
/// formatted durations starting with it (so `3:` finds every 3-minute track).
pub fn matches_duration(duration_ms: u64, filter: &str) -> bool {
    match parse_duration(filter) {
        Some(target) => duration_ms.abs_diff(target) <= DURATION_TOLERANCE_MS,
        None => format_duration(duration_ms).starts_with(filter.trim()),
    }
}

/// Case-insensitive substring match on title or any artist.
pub fn matches_search(track: &TrackEntry, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    track.name.to_lowercase().contains(&query)
        || track.artists.iter().any(|a| a.name.to_lowercase().contains(&query))
}
