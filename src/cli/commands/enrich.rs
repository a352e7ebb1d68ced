//! Tempo enrichment command and the shared progress loop.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Runtime;

use crate::enrichment::{EnrichmentPipeline, EnrichmentStatus, PipelineState};
use crate::library;
use crate::model::TrackEntry;

use super::Context;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Look up tempos for every library track without a feature record
pub fn cmd_enrich(rt: &Runtime, ctx: &Context, api_key: Option<&str>) -> anyhow::Result<()> {
    let client = ctx.lookup_client(api_key)?;
    let rules = ctx.rules()?;

    rt.block_on(async {
        let (snapshots, features) = ctx.open_caches().await?;
        let library = library::build_library(&snapshots, &features, &rules, Utc::now()).await?;

        let missing = library.missing_tracks();
        if missing.is_empty() {
            println!("All {} tracks already have feature records.", library.tracks.len());
            return Ok(());
        }

        println!(
            "Looking up {} of {} tracks (~{:.0}s at the configured pace)",
            missing.len(),
            library.tracks.len(),
            ctx.config.enrichment.request_delay().as_secs_f64() * missing.len() as f64
        );

        let pipeline = ctx.enrichment_pipeline(client, features.clone());
        let status = run_with_progress(&pipeline, missing).await?;
        print_summary(&status);

        let stats = features.stats().await?;
        println!(
            "Feature cache: {} provider, {} looked up, {} not found",
            stats.metadata_provider, stats.lookup_service, stats.not_found
        );
        anyhow::Ok(())
    })
}

/// Run one enrichment pass, redrawing a progress line until the worker exits.
///
/// A fatal condition (bad credential, unusable cache) becomes an error.
pub(super) async fn run_with_progress(
    pipeline: &EnrichmentPipeline,
    tracks: Vec<TrackEntry>,
) -> anyhow::Result<EnrichmentStatus> {
    pipeline.start(tracks);

    let done = pipeline.wait();
    let mut done = std::pin::pin!(done);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    let status = loop {
        tokio::select! {
            status = &mut done => break status,
            _ = ticker.tick() => print_progress(&pipeline.status()),
        }
    };
    print_progress(&status);
    println!();

    if let Some(fatal) = &status.fatal {
        anyhow::bail!("Enrichment halted: {fatal} ({} track(s) left queued)", status.pending);
    }
    Ok(status)
}

fn print_progress(status: &EnrichmentStatus) {
    let track = match status.state {
        PipelineState::Running => status.current_track.as_deref().unwrap_or(""),
        _ => "",
    };
    print!(
        "\r[{}/{}] {} found, {} not found, {} failed  {:<40.40}",
        status.current, status.total, status.hits, status.misses, status.failures, track
    );
    let _ = std::io::stdout().flush();
}

fn print_summary(status: &EnrichmentStatus) {
    println!("✓ Enrichment complete");
    println!("  Found:     {}", status.hits);
    println!("  Not found: {}", status.misses);
    if status.failures > 0 {
        println!("  Failed:    {} (will be retried next run)", status.failures);
    }
    if status.skipped > 0 {
        println!("  Skipped:   {} (already cached)", status.skipped);
    }
}
