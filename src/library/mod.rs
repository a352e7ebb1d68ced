//! Library workflows on top of the caches.
//!
//! - [`sync`] - provider → snapshot cache (and optional provider features)
//! - [`view`] - snapshot cache → ranked [`Library`], display helpers

pub mod sync;
pub mod view;

pub use sync::{SyncOptions, SyncReport, Synced, import_provider_features, refresh_playlist, sync_playlists};
pub use view::{Library, build_library, format_duration, matches_duration, matches_search, parse_duration};
