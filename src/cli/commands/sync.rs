//! Playlist sync commands.

use tokio::runtime::Runtime;

use crate::library;

use super::Context;

/// Fetch library and class playlists into the snapshot cache
pub fn cmd_sync(rt: &Runtime, ctx: &Context, token: Option<&str>, provider_features: bool) -> anyhow::Result<()> {
    let source = ctx.playlist_source(token)?;
    let rules = ctx.rules()?;

    rt.block_on(async {
        let (snapshots, features) = ctx.open_caches().await?;

        println!("Syncing playlists...");
        let synced = library::sync_playlists(&source, &snapshots, &rules, ctx.sync_options()).await?;
        let report = &synced.report;

        println!();
        println!("✓ Sync complete");
        println!("  New:       {}", report.inserted.len());
        println!("  Changed:   {}", report.replaced.len());
        println!("  Unchanged: {}", report.unchanged.len());
        println!("  Skipped:   {}", report.skipped.len());

        let (library_lists, class_lists) = rules.partition(&synced.records);
        println!();
        println!(
            "{} library playlist(s), {} class playlist(s)",
            library_lists.len(),
            class_lists.len()
        );
        if library_lists.is_empty() {
            println!(
                "  No playlist name or description contains \"{}\"",
                ctx.config.playlists.library_marker
            );
        }

        if provider_features {
            let stored = library::import_provider_features(&source, &features, &synced.records).await?;
            println!("Imported {} provider feature record(s)", stored);
        }

        anyhow::Ok(())
    })
}

/// Force a re-download of one playlist
pub fn cmd_refresh(rt: &Runtime, ctx: &Context, id: &str, token: Option<&str>) -> anyhow::Result<()> {
    let source = ctx.playlist_source(token)?;

    rt.block_on(async {
        let (snapshots, _) = ctx.open_caches().await?;
        let record = library::refresh_playlist(&source, &snapshots, id, ctx.sync_options()).await?;
        println!(
            "✓ Refreshed '{}' ({} tracks, snapshot {})",
            record.name,
            record.track_list.len(),
            record.snapshot_id
        );
        anyhow::Ok(())
    })
}
