//! Converts Spotify DTOs into domain types.

use chrono::{DateTime, Utc};

use super::dto;
use crate::model::{ArtistRef, FeatureRecord, FeatureSource, TrackEntry};
use crate::source::{Page, PageRequest, PlaylistSummary};

const PITCH_CLASSES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

pub fn to_playlist_page(paging: dto::Paging<dto::SimplifiedPlaylist>) -> Page<PlaylistSummary> {
    let next = next_request(&paging);
    Page {
        items: paging
            .items
            .into_iter()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
                description: p.description.unwrap_or_default(),
                snapshot_id: p.snapshot_id,
                public: p.public,
                track_count: p.tracks.map(|t| t.total).unwrap_or(0),
            })
            .collect(),
        next,
        total: Some(paging.total),
    }
}

/// Local files and removed tracks have no id and are dropped here.
pub fn to_track_page(paging: dto::Paging<dto::PlaylistTrackItem>) -> Page<TrackEntry> {
    let next = next_request(&paging);
    Page {
        items: paging.items.into_iter().filter_map(to_track_entry).collect(),
        next,
        total: Some(paging.total),
    }
}

fn to_track_entry(item: dto::PlaylistTrackItem) -> Option<TrackEntry> {
    let track = item.track?;
    if track.is_local {
        return None;
    }
    let id = track.id.filter(|id| !id.is_empty())?;

    Some(TrackEntry {
        id,
        added_at: item.added_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        name: track.name,
        duration_ms: track.duration_ms,
        artists: track
            .artists
            .into_iter()
            .map(|a| ArtistRef { id: a.id, name: a.name })
            .collect(),
    })
}

/// Cursor for the page after this one, counting raw items so dropped
/// entries don't shift the offset.
fn next_request<T>(paging: &dto::Paging<T>) -> Option<PageRequest> {
    paging.next.as_ref()?;
    let limit = if paging.limit == 0 { paging.items.len() as u32 } else { paging.limit };
    if paging.items.is_empty() {
        return None;
    }
    Some(PageRequest {
        offset: paging.offset + paging.items.len() as u32,
        limit,
    })
}

pub fn to_feature_records(response: dto::AudioFeaturesResponse, checked_at: DateTime<Utc>) -> Vec<FeatureRecord> {
    response
        .audio_features
        .into_iter()
        .flatten()
        .map(|f| FeatureRecord {
            key: key_name(f.key, f.mode),
            id: f.id,
            tempo: f.tempo,
            energy: f.energy,
            danceability: f.danceability,
            source: FeatureSource::MetadataProvider,
            checked_at: Some(checked_at),
        })
        .collect()
}

/// "C#" for major, "C#m" for minor; `None` for undetected keys.
fn key_name(key: Option<i32>, mode: Option<i32>) -> Option<String> {
    let pitch = PITCH_CLASSES.get(usize::try_from(key?).ok()?)?;
    let suffix = if mode == Some(0) { "m" } else { "" };
    Some(format!("{pitch}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Option<&str>, local: bool) -> dto::PlaylistTrackItem {
        dto::PlaylistTrackItem {
            added_at: Some(Utc::now()),
            track: Some(dto::TrackObject {
                id: id.map(String::from),
                name: "Song".to_string(),
                duration_ms: 1000,
                artists: vec![dto::ArtistObject {
                    id: None,
                    name: "Artist".to_string(),
                }],
                is_local: local,
            }),
        }
    }

    fn paging<T>(items: Vec<T>, next: bool, offset: u32) -> dto::Paging<T> {
        dto::Paging {
            items,
            next: next.then(|| "https://next".to_string()),
            offset,
            limit: 3,
            total: 10,
        }
    }

    #[test]
    fn test_drops_local_and_removed_tracks() {
        let items = vec![
            item(Some("a"), false),
            item(None, true),
            dto::PlaylistTrackItem {
                added_at: None,
                track: None,
            },
        ];
        let page = to_track_page(paging(items, true, 0));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].artists[0].name, "Artist");
        // Offset advances past all three raw rows
        assert_eq!(page.next, Some(PageRequest { offset: 3, limit: 3 }));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = to_track_page(paging(vec![item(Some("a"), false)], false, 9));
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_missing_added_at_falls_back_to_epoch() {
        let mut raw = item(Some("a"), false);
        raw.added_at = None;
        let entry = to_track_entry(raw).unwrap();
        assert_eq!(entry.added_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(Some(1), Some(1)).as_deref(), Some("C#"));
        assert_eq!(key_name(Some(9), Some(0)).as_deref(), Some("Am"));
        assert_eq!(key_name(Some(-1), Some(1)), None);
        assert_eq!(key_name(None, None), None);
    }

    #[test]
    fn test_feature_records_are_provider_sourced() {
        let response = dto::AudioFeaturesResponse {
            audio_features: vec![
                Some(dto::AudioFeatures {
                    id: "a".to_string(),
                    tempo: Some(120.5),
                    energy: Some(0.7),
                    danceability: Some(0.5),
                    key: Some(0),
                    mode: Some(1),
                }),
                None,
            ],
        };
        let records = to_feature_records(response, Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, FeatureSource::MetadataProvider);
        assert_eq!(records[0].key.as_deref(), Some("C"));
    }
}
