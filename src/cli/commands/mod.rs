//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `sync`: playlist download into the snapshot cache
//! - `list`: ranked library output with filters
//! - `enrich`: background tempo lookups with progress
//! - `cache`: cache reset
//! - `config`: effective configuration

mod cache;
mod config;
mod enrich;
mod list;
mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::cache::{FeatureCache, SnapshotCache};
use crate::config::Config;
use crate::enrichment::{EnrichmentPipeline, GetSongBpmClient, PipelineConfig};
use crate::library::SyncOptions;
use crate::source::spotify::SpotifyClient;
use crate::source::{PageRetry, PlaylistRules, StaticToken};
use crate::{db, config as app_config};

use cache::cmd_clear;
use config::cmd_config;
use enrich::cmd_enrich;
use list::{ListOptions, cmd_list};
use sync::{cmd_refresh, cmd_sync};

/// Playlist Planner CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database path (default: from config, else the user data directory)
    #[arg(long, global = true, env = "PLAYLIST_PLANNER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch library and class playlists into the local cache
    Sync {
        /// Spotify access token (or set SPOTIFY_ACCESS_TOKEN env var)
        #[arg(short, long, env = "SPOTIFY_ACCESS_TOKEN")]
        token: Option<String>,
        /// Also import Spotify's own audio features for tracks without any
        #[arg(long)]
        provider_features: bool,
    },
    /// Re-download one playlist regardless of its snapshot id
    Refresh {
        /// Playlist id
        id: String,
        /// Spotify access token (or set SPOTIFY_ACCESS_TOKEN env var)
        #[arg(short, long, env = "SPOTIFY_ACCESS_TOKEN")]
        token: Option<String>,
    },
    /// Print the ranked library
    List {
        /// Only tracks within 5 seconds of this duration (m:ss)
        #[arg(short, long)]
        duration: Option<String>,
        /// Only tracks whose title or artist contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Print at most this many tracks
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print the list, then look up missing tempos and print it again
        #[arg(long)]
        enrich: bool,
        /// GetSongBPM API key (or set GETSONGBPM_API_KEY env var)
        #[arg(short, long, env = "GETSONGBPM_API_KEY")]
        api_key: Option<String>,
    },
    /// Look up tempos for library tracks that have no feature record
    Enrich {
        /// GetSongBPM API key (or set GETSONGBPM_API_KEY env var)
        #[arg(short, long, env = "GETSONGBPM_API_KEY")]
        api_key: Option<String>,
    },
    /// Wipe cached playlists (and optionally feature records)
    Clear {
        /// Also forget "not found" lookups so they are retried
        #[arg(long, conflicts_with = "features")]
        tombstones: bool,
        /// Also wipe every feature record
        #[arg(long)]
        features: bool,
    },
    /// Show the config file location and effective settings
    Config {
        /// Write the current settings (defaults if no file) to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let ctx = Context::new(cli.db.clone());

    match &cli.command {
        Commands::Sync {
            token,
            provider_features,
        } => cmd_sync(&rt, &ctx, token.as_deref(), *provider_features),
        Commands::Refresh { id, token } => cmd_refresh(&rt, &ctx, id, token.as_deref()),
        Commands::List {
            duration,
            search,
            limit,
            enrich,
            api_key,
        } => {
            let options = ListOptions {
                duration: duration.clone(),
                search: search.clone(),
                limit: *limit,
                enrich: *enrich,
            };
            cmd_list(&rt, &ctx, &options, api_key.as_deref())
        }
        Commands::Enrich { api_key } => cmd_enrich(&rt, &ctx, api_key.as_deref()),
        Commands::Clear { tombstones, features } => cmd_clear(&rt, &ctx, *tombstones, *features),
        Commands::Config { init } => cmd_config(&ctx, *init),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Loaded configuration plus command-line overrides.
pub(crate) struct Context {
    pub config: Config,
    pub db_path: PathBuf,
}

impl Context {
    fn new(db_override: Option<PathBuf>) -> Self {
        let config = app_config::load();
        let db_path = db_override.unwrap_or_else(|| config.database.resolved_path());
        Self { config, db_path }
    }

    /// Open (creating if needed) the database and wrap both caches.
    pub async fn open_caches(&self) -> anyhow::Result<(SnapshotCache, FeatureCache)> {
        ensure_parent_dir(&self.db_path)?;
        let pool = db::init_db(&db::db_url(Some(&self.db_path)))
            .await
            .with_context(|| format!("Failed to open database {}", self.db_path.display()))?;
        Ok((SnapshotCache::new(pool.clone()), FeatureCache::new(pool)))
    }

    pub fn rules(&self) -> anyhow::Result<PlaylistRules> {
        PlaylistRules::from_config(&self.config.playlists).with_context(|| {
            format!(
                "Invalid class_date_pattern '{}' in config",
                self.config.playlists.class_date_pattern
            )
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_size: self.config.playlists.page_size.max(1),
            retry: PageRetry {
                pause: self.config.enrichment.rate_limit_backoff(),
                max_attempts: self.config.enrichment.max_rate_limit_retries.max(1),
            },
        }
    }

    /// Spotify client from the flag/env token, else the config file.
    pub fn playlist_source(&self, token: Option<&str>) -> anyhow::Result<SpotifyClient> {
        let token = token
            .map(String::from)
            .or_else(|| self.config.credentials.playlist_source_token.clone())
            .filter(|t| !t.trim().is_empty())
            .context("Spotify access token required: use --token or set SPOTIFY_ACCESS_TOKEN")?;
        Ok(SpotifyClient::new(Arc::new(StaticToken::new(token)))?)
    }

    /// Enrichment worker paced by the `[enrichment]` settings.
    pub fn enrichment_pipeline(&self, client: GetSongBpmClient, features: FeatureCache) -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            Arc::new(client),
            features,
            PipelineConfig::from(&self.config.enrichment),
        )
    }

    /// Lookup client from the flag/env key, else the config file.
    pub fn lookup_client(&self, api_key: Option<&str>) -> anyhow::Result<GetSongBpmClient> {
        let key = api_key
            .map(String::from)
            .or_else(|| self.config.credentials.lookup_api_key.clone())
            .unwrap_or_default();
        GetSongBpmClient::with_base_url(key, &self.config.enrichment.base_url).map_err(|e| {
            anyhow::anyhow!("{e}\nGet a key at: https://getsongbpm.com/api")
        })
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
