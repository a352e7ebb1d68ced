//! Playlist Planner - ranks a song library by how recently each track
//! was programmed into a dated class playlist.
//!
//! Playlists are synced from Spotify into a local SQLite cache, aggregated
//! into a recency-ranked library, and backfilled with tempo data from a
//! lookup service by a pausable background worker.

pub mod aggregator;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod library;
pub mod model;
pub mod source;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIRECTIVE: &str = "playlist_planner=info";

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter(EnvFilter::from_default_env()))
        .init();

    cli::run_command(&args)
}

/// `RUST_LOG` directives plus info-level output for this crate's modules.
fn log_filter(env: EnvFilter) -> EnvFilter {
    match DEFAULT_LOG_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => env.add_directive(directive),
        Err(_) => env,
    }
}
