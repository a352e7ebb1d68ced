//! Command-line interface for playlist-planner.
//!
//! This module provides CLI commands for syncing playlists, listing the
//! ranked library, running tempo enrichment and managing the caches.

mod commands;

pub use commands::{Cli, Commands, run_command};
