//! GetSongBPM API integration
//!
//! Free tempo/key database searched by song title.
//! API docs: https://getsongbpm.com/api

mod adapter;
mod client;
pub mod dto;

pub use adapter::to_candidates;
pub use client::{DEFAULT_BASE_URL, GetSongBpmClient};
