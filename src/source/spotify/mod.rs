//! Spotify Web API integration.
//!
//! - `dto` - exact wire shapes
//! - `adapter` - DTO to domain conversion
//! - `client` - HTTP client implementing [`PlaylistSource`](crate::source::PlaylistSource)

mod adapter;
pub mod client;
pub mod dto;

pub use client::{MAX_FEATURE_IDS, SpotifyClient};
