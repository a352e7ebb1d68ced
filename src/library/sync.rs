//! Playlist sync: provider → snapshot cache.
//!
//! Lists every playlist, keeps the library and class ones, and only
//! downloads track lists whose snapshot id moved since the last sync.

use std::collections::HashSet;

use crate::cache::{FeatureCache, SnapshotCache};
use crate::error::{Result, ResultExt};
use crate::model::PlaylistRecord;
use crate::source::spotify::MAX_FEATURE_IDS;
use crate::source::{
    PageRetry, PlaylistRole, PlaylistRules, PlaylistSource, PlaylistSummary, SourceError, fetch_all_playlists,
    fetch_all_tracks,
};

/// Paging behaviour for a sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub page_size: u32,
    pub retry: PageRetry,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            retry: PageRetry::default(),
        }
    }
}

/// What a sync did, by playlist id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: Vec<String>,
    /// Playlists classified as neither library nor class
    pub skipped: Vec<String>,
    /// Playlists whose track list was downloaded this time
    pub fetched: Vec<String>,
}

/// Result of [`sync_playlists`].
#[derive(Debug, Clone)]
pub struct Synced {
    pub report: SyncReport,
    /// Every library and class playlist, in provider order
    pub records: Vec<PlaylistRecord>,
}

/// Pull the user's playlists into the snapshot cache.
pub async fn sync_playlists(
    source: &dyn PlaylistSource,
    snapshots: &SnapshotCache,
    rules: &PlaylistRules,
    options: SyncOptions,
) -> Result<Synced> {
    let summaries = fetch_all_playlists(source, options.page_size, options.retry)
        .await
        .with_context("Failed to list playlists")?;

    tracing::info!("Found {} playlists", summaries.len());

    let mut report = SyncReport::default();
    let mut records = Vec::new();

    for summary in summaries {
        let role = rules.classify(&summary);
        if role == PlaylistRole::Ignored {
            tracing::trace!("Skipping '{}'", summary.name);
            report.skipped.push(summary.id);
            continue;
        }

        let cached = match snapshots.snapshot_id(&summary.id).await? {
            Some(snapshot) if snapshot == summary.snapshot_id => snapshots.get(&summary.id).await?,
            _ => None,
        };

        let record = match cached {
            Some(record) => record,
            None => {
                tracing::debug!("Fetching {:?} playlist '{}'", role, summary.name);
                report.fetched.push(summary.id.clone());
                download(source, summary, options).await?
            }
        };
        records.push(record);
    }

    let upserted = snapshots.upsert_if_changed(&records).await?;
    report.inserted = upserted.inserted;
    report.replaced = upserted.replaced;
    report.unchanged = upserted.unchanged;

    tracing::info!(
        "Sync complete: {} new, {} changed, {} unchanged, {} skipped",
        report.inserted.len(),
        report.replaced.len(),
        report.unchanged.len(),
        report.skipped.len()
    );

    Ok(Synced { report, records })
}

/// Force a re-download of one playlist and replace its cached copy.
pub async fn refresh_playlist(
    source: &dyn PlaylistSource,
    snapshots: &SnapshotCache,
    playlist_id: &str,
    options: SyncOptions,
) -> Result<PlaylistRecord> {
    let summary = fetch_all_playlists(source, options.page_size, options.retry)
        .await?
        .into_iter()
        .find(|p| p.id == playlist_id)
        .ok_or_else(|| SourceError::NotFound(playlist_id.to_string()))?;

    let record = download(source, summary, options)
        .await
        .with_context(format!("Failed to refresh playlist {playlist_id}"))?;
    snapshots.put(&record).await?;

    tracing::info!("Refreshed '{}' ({} tracks)", record.name, record.track_list.len());
    Ok(record)
}

/// Store the provider's own audio features for tracks that have no record.
///
/// Returns the number of records written.
pub async fn import_provider_features(
    source: &dyn PlaylistSource,
    features: &FeatureCache,
    records: &[PlaylistRecord],
) -> Result<usize> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = records
        .iter()
        .flat_map(|p| &p.track_list)
        .filter(|t| seen.insert(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect();

    let known = features.get_many(&ids).await?;
    let missing: Vec<String> = ids.into_iter().filter(|id| !known.contains_key(id)).collect();

    let mut stored = 0;
    for chunk in missing.chunks(MAX_FEATURE_IDS) {
        let batch = source
            .audio_features(chunk)
            .await
            .with_context("Failed to fetch provider audio features")?;
        for record in &batch {
            features.put(record).await?;
        }
        stored += batch.len();
    }

    tracing::info!("Imported {} provider feature records ({} requested)", stored, missing.len());
    Ok(stored)
}

async fn download(
    source: &dyn PlaylistSource,
    summary: PlaylistSummary,
    options: SyncOptions,
) -> std::result::Result<PlaylistRecord, SourceError> {
    let track_list = fetch_all_tracks(source, &summary.id, options.page_size, options.retry).await?;
    Ok(PlaylistRecord {
        id: summary.id,
        name: summary.name,
        description: summary.description,
        snapshot_id: summary.snapshot_id,
        track_list,
    })
}
