//! Adapter layer: Convert GetSongBPM DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use super::dto;
use crate::enrichment::domain::{LookupError, SongCandidate};

/// Error strings the service uses for a dead key (sent with HTTP 200).
const CREDENTIAL_ERRORS: [&str; 2] = ["Invalid API Key", "inactive"];

/// Convert a search response into candidates.
///
/// "no result" is an empty list, not an error.
pub fn to_candidates(response: dto::SearchResponse) -> Result<Vec<SongCandidate>, LookupError> {
    if let Some(message) = response.error {
        if CREDENTIAL_ERRORS.iter().any(|marker| message.contains(marker)) {
            return Err(LookupError::Unauthorized);
        }
        return Err(LookupError::Api(message));
    }

    match response.search {
        Some(dto::SearchField::Results(results)) => Ok(results.into_iter().map(to_candidate).collect()),
        Some(dto::SearchField::Error { .. }) | None => Ok(Vec::new()),
    }
}

fn to_candidate(song: dto::SongResult) -> SongCandidate {
    SongCandidate {
        title: song.title.unwrap_or_default(),
        artist: song.artist.and_then(|a| a.name).unwrap_or_default(),
        album: song.album.and_then(|a| a.title),
        tempo: song.tempo,
        key: song.key_of.filter(|k| !k.is_empty()),
        time_signature: song.time_sig.filter(|t| !t.is_empty()),
        danceability: song.danceability,
        acousticness: song.acousticness,
    }
}
