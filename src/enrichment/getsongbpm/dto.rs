//! GetSongBPM API Data Transfer Objects
//!
//! These types match what the search endpoint returns.
//! DO NOT use these types outside the getsongbpm module - convert to domain types.
//!
//! Example responses:
//! ```json
//! {"search": [{"id": "Xx", "title": "Yesterday", "tempo": "97",
//!   "key_of": "F", "danceability": 33,
//!   "artist": {"name": "The Beatles"}, "album": {"title": "Help!"}}]}
//!
//! {"search": {"error": "no result"}}
//!
//! {"error": "Invalid API Key"}
//! ```
//!
//! Numeric fields arrive as strings or numbers depending on the record.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search: Option<SearchField>,
    /// Set instead of `search` when the request itself was rejected
    #[serde(default)]
    pub error: Option<String>,
}

/// `search` is a list on success and an object on "no result".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SearchField {
    Results(Vec<SongResult>),
    Error { error: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistInfo>,
    #[serde(default)]
    pub album: Option<AlbumInfo>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub key_of: Option<String>,
    #[serde(default)]
    pub time_sig: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub danceability: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acousticness: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumInfo {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Accepts `97`, `97.5`, `"97"`, `""` and `null`; anything unparseable is `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
