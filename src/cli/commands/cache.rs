//! Cache maintenance commands.

use tokio::runtime::Runtime;

use super::Context;

/// Wipe the playlist cache, optionally with tombstones or all feature records
pub fn cmd_clear(rt: &Runtime, ctx: &Context, tombstones: bool, features: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let (snapshots, feature_cache) = ctx.open_caches().await?;

        let playlists = snapshots.clear().await?;
        println!("✓ Removed {} cached playlist(s)", playlists);

        if features {
            let removed = feature_cache.clear().await?;
            println!("✓ Removed {} feature record(s)", removed);
        } else if tombstones {
            let removed = feature_cache.clear_tombstones().await?;
            println!("✓ Removed {} not-found record(s); those tracks will be looked up again", removed);
        }

        tracing::info!(db = %ctx.db_path.display(), "Cache cleared");
        anyhow::Ok(())
    })
}
