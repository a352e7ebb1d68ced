//! Playlist role detection.
//!
//! A thin filter over names and descriptions:
//! ignored names and (optionally) private playlists are dropped, the
//! library marker selects library playlists, and a date-shaped string
//! selects class playlists.

use regex::Regex;

use super::PlaylistSummary;
use crate::config::PlaylistConfig;
use crate::model::PlaylistRecord;

/// What a playlist is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistRole {
    /// Canonical pool of candidate tracks
    Library,
    /// One dated programming event
    Class,
    /// Neither; not cached or aggregated
    Ignored,
}

/// Compiled classification rules.
#[derive(Debug, Clone)]
pub struct PlaylistRules {
    library_marker: String,
    class_pattern: Regex,
    ignore: Vec<String>,
    public_only: bool,
}

impl PlaylistRules {
    pub fn new(
        library_marker: impl Into<String>,
        class_pattern: &str,
        ignore: Vec<String>,
        public_only: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            library_marker: library_marker.into(),
            class_pattern: Regex::new(class_pattern)?,
            ignore,
            public_only,
        })
    }

    pub fn from_config(config: &PlaylistConfig) -> Result<Self, regex::Error> {
        Self::new(
            config.library_marker.clone(),
            &config.class_date_pattern,
            config.ignore.clone(),
            config.public_only,
        )
    }

    /// Role by name/description alone.
    pub fn role(&self, name: &str, description: &str) -> PlaylistRole {
        if self.ignore.iter().any(|ignored| ignored == name) {
            return PlaylistRole::Ignored;
        }
        if name == self.library_marker
            || (!self.library_marker.is_empty() && description.contains(&self.library_marker))
        {
            return PlaylistRole::Library;
        }
        if self.class_pattern.is_match(name) || self.class_pattern.is_match(description) {
            return PlaylistRole::Class;
        }
        PlaylistRole::Ignored
    }

    /// Role of a listed playlist, applying the visibility filter too.
    pub fn classify(&self, summary: &PlaylistSummary) -> PlaylistRole {
        if self.public_only && summary.public == Some(false) {
            return PlaylistRole::Ignored;
        }
        self.role(&summary.name, &summary.description)
    }

    /// Split cached records into (library, class), keeping their order.
    pub fn partition<'a>(
        &self,
        records: &'a [PlaylistRecord],
    ) -> (Vec<&'a PlaylistRecord>, Vec<&'a PlaylistRecord>) {
        let mut library = Vec::new();
        let mut classes = Vec::new();
        for record in records {
            match self.role(&record.name, &record.description) {
                PlaylistRole::Library => library.push(record),
                PlaylistRole::Class => classes.push(record),
                PlaylistRole::Ignored => {}
            }
        }
        (library, classes)
    }
}
