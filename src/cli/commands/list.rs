//! Ranked library listing.

use std::io::Write;

use chrono::Utc;
use tokio::runtime::Runtime;

use crate::cache::FeatureCache;
use crate::enrichment::EnrichmentPipeline;
use crate::library::{self, Library, format_duration, matches_duration, matches_search};
use crate::model::AggregatedTrack;

use super::Context;
use super::enrich::run_with_progress;

/// Filters and switches for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub duration: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub enrich: bool,
}

/// Print the ranked library from the cache
pub fn cmd_list(rt: &Runtime, ctx: &Context, options: &ListOptions, api_key: Option<&str>) -> anyhow::Result<()> {
    let rules = ctx.rules()?;
    let client = if options.enrich {
        Some(ctx.lookup_client(api_key)?)
    } else {
        None
    };

    rt.block_on(async {
        let (snapshots, features) = ctx.open_caches().await?;
        let mut library = library::build_library(&snapshots, &features, &rules, Utc::now()).await?;
        let pipeline = client.map(|client| ctx.enrichment_pipeline(client, features.clone()));

        let mut stdout = std::io::stdout();
        show_library(&mut stdout, &mut library, &features, options, pipeline.as_ref()).await
    })
}

/// Write the table straight away; with a pipeline, then fill in missing
/// tempos and write the refreshed table as a second listing.
async fn show_library(
    out: &mut impl Write,
    library: &mut Library,
    features: &FeatureCache,
    options: &ListOptions,
    pipeline: Option<&EnrichmentPipeline>,
) -> anyhow::Result<()> {
    write_table(out, library, options)?;

    let Some(pipeline) = pipeline else {
        return Ok(());
    };
    let missing = library.missing_tracks();
    if missing.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Looking up tempos for {} track(s)...", missing.len())?;
    out.flush()?;
    let status = run_with_progress(pipeline, missing).await?;

    library.refresh_features(features).await?;
    writeln!(out)?;
    writeln!(
        out,
        "Updated: {} found, {} not found, {} failed",
        status.hits, status.misses, status.failures
    )?;
    write_table(out, library, options)
}

fn write_table(out: &mut impl Write, library: &Library, options: &ListOptions) -> anyhow::Result<()> {
    let shown = filter_tracks(&library.tracks, options);
    if shown.is_empty() {
        writeln!(out, "No tracks match.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>4}  {:<36} {:<24} {:>6} {:>6} {:>5}  Last played",
        "#", "Title", "Artist", "Time", "BPM", "Score"
    )?;
    for (rank, track) in &shown {
        writeln!(out, "{}", format_row(*rank, track))?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "{} of {} tracks ({} library, {} class playlists)",
        shown.len(),
        library.tracks.len(),
        library.library_playlists,
        library.class_playlists
    )?;
    out.flush()?;
    Ok(())
}

/// Apply filters, keeping each track's 1-based rank in the full list.
fn filter_tracks<'a>(tracks: &'a [AggregatedTrack], options: &ListOptions) -> Vec<(usize, &'a AggregatedTrack)> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (i + 1, t))
        .filter(|(_, t)| {
            options
                .duration
                .as_deref()
                .is_none_or(|d| matches_duration(t.track.duration_ms, d))
        })
        .filter(|(_, t)| options.search.as_deref().is_none_or(|q| matches_search(&t.track, q)))
        .take(options.limit.unwrap_or(usize::MAX))
        .collect()
}

fn format_row(rank: usize, track: &AggregatedTrack) -> String {
    let tempo = match &track.audio_features {
        Some(record) => match record.playable_tempo() {
            Some(bpm) => format!("{bpm:.0}"),
            None => "-".to_string(),
        },
        None => "?".to_string(),
    };
    let last_played = track
        .last_played()
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "{:>4}  {:<36.36} {:<24.24} {:>6} {:>6} {:>5}  {}",
        rank,
        track.track.name,
        track.track.artist_names(),
        format_duration(track.track.duration_ms),
        tempo,
        track.recency_score,
        last_played
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::config::PlaylistConfig;
    use crate::enrichment::PipelineConfig;
    use crate::enrichment::traits::mocks::MockLookup;
    use crate::model::FeatureRecord;
    use crate::source::PlaylistRules;
    use crate::test_utils::{mock_features, mock_playlist, mock_track, named_track, temp_db};
    use std::sync::Arc;
    use std::time::Duration;

    fn track(id: &str, title: &str, duration_ms: u64) -> AggregatedTrack {
        let mut entry = named_track(id, title, "Artist");
        entry.duration_ms = duration_ms;
        AggregatedTrack::seed(entry, "Aggregated Cycle")
    }

    #[test]
    fn test_filters_keep_original_rank() {
        let tracks = vec![
            track("a", "Alpha", 200_000),
            track("b", "Bravo", 180_000),
            track("c", "Charlie", 182_000),
        ];
        let options = ListOptions {
            duration: Some("3:00".to_string()),
            ..Default::default()
        };
        let ranks: Vec<_> = filter_tracks(&tracks, &options).into_iter().map(|(r, _)| r).collect();
        assert_eq!(ranks, vec![2, 3]);

        let options = ListOptions {
            search: Some("char".to_string()),
            ..Default::default()
        };
        let shown = filter_tracks(&tracks, &options);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, 3);
    }

    #[test]
    fn test_limit_applies_after_filters() {
        let tracks = vec![
            track("a", "Alpha", 200_000),
            track("b", "Bravo", 180_000),
            track("c", "Charlie", 182_000),
        ];
        let options = ListOptions {
            duration: Some("3:00".to_string()),
            limit: Some(1),
            ..Default::default()
        };
        let shown = filter_tracks(&tracks, &options);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].1.id(), "b");
    }

    #[test]
    fn test_row_tempo_column() {
        let mut t = track("a", "Alpha", 185_000);
        assert!(format_row(1, &t).contains(" ? "));

        t.audio_features = Some(mock_features("a", 127.6));
        let row = format_row(1, &t);
        assert!(row.contains("128"));
        assert!(row.contains("3:05"));
        assert!(row.ends_with("never"));

        t.audio_features = Some(FeatureRecord::not_found("a", Utc::now()));
        assert!(format_row(1, &t).contains(" - "));
    }

    #[tokio::test]
    async fn test_enrich_prints_library_before_lookups() {
        let (pool, _dir) = temp_db().await;
        let snapshots = SnapshotCache::new(pool.clone());
        let features = FeatureCache::new(pool);
        snapshots
            .put(&mock_playlist("lib", "Aggregated Cycle", "s", vec![mock_track("t1", 5)]))
            .await
            .unwrap();
        let rules = PlaylistRules::from_config(&PlaylistConfig::default()).unwrap();
        let mut library = library::build_library(&snapshots, &features, &rules, Utc::now()).await.unwrap();

        let pipeline = EnrichmentPipeline::new(
            Arc::new(MockLookup::with_songs(&[("Song t1", "Artist t1", 120.0)])),
            features.clone(),
            PipelineConfig {
                request_delay: Duration::ZERO,
                ..PipelineConfig::default()
            },
        );

        let mut out = Vec::new();
        show_library(&mut out, &mut library, &features, &ListOptions::default(), Some(&pipeline))
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().filter(|l| l.contains("Song t1")).collect();
        assert_eq!(rows.len(), 2);
        // First listing is written before any tempo is known
        assert!(rows[0].contains(" ? "));
        assert!(rows[1].contains(" 120 "));
        assert!(text.find("Looking up tempos").unwrap() > text.find("Song t1").unwrap());
    }

    #[tokio::test]
    async fn test_list_without_pipeline_prints_once() {
        let (pool, _dir) = temp_db().await;
        let features = FeatureCache::new(pool);
        let mut library = Library {
            tracks: vec![track("a", "Alpha", 200_000)],
            library_playlists: 1,
            class_playlists: 0,
        };

        let mut out = Vec::new();
        show_library(&mut out, &mut library, &features, &ListOptions::default(), None)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Alpha").count(), 1);
        assert!(text.contains("1 of 1 tracks (1 library, 0 class playlists)"));
    }
}
