//! Fuzzy title/artist matching for lookup results.
//!
//! The service is searched by title only, so every result list has to be
//! filtered by artist here. A result is only accepted when both its title
//! and its artist overlap the query; a same-titled song by someone else
//! (a cover, a namesake) counts as a miss.

use std::sync::LazyLock;

use regex::Regex;

use super::domain::SongCandidate;

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(.*?\)\s*").unwrap());
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[.*?\]\s*").unwrap());
static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*-\s*(remaster|remix|edit|version|mix|radio|extended|live|acoustic|instrumental|explicit|clean).*$",
    )
    .unwrap()
});
static FEATURING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*\b(feat|ft)\b\.?.*$").unwrap());

/// Strip annotations that hurt search recall.
///
/// Removes `(...)` and `[...]` groups, a trailing " - Remastered 2011"
/// style suffix, and featured-artist credits.
pub fn clean_search_term(term: &str) -> String {
    let term = PARENTHETICAL.replace_all(term, " ");
    let term = BRACKETED.replace_all(&term, " ");
    let term = VERSION_SUFFIX.replace(&term, "");
    let term = FEATURING.replace(&term, "");
    term.trim().to_string()
}

fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}

/// 100 for an exact title, 50 when one contains the other, else 0.
pub fn title_score(result: &str, query: &str) -> u32 {
    let (result, query) = (normalize(result), normalize(query));
    if result.is_empty() || query.is_empty() {
        return 0;
    }
    if result == query {
        100
    } else if result.contains(&query) || query.contains(&result) {
        50
    } else {
        0
    }
}

/// 100 exact, 75 substring either way, else 25 per shared word of 3+ chars.
pub fn artist_score(result: &str, query: &str) -> u32 {
    let (result, query) = (normalize(result), normalize(query));
    if result.is_empty() || query.is_empty() {
        return 0;
    }
    if result == query {
        return 100;
    }
    if result.contains(&query) || query.contains(&result) {
        return 75;
    }
    let shared = query
        .split_whitespace()
        .filter(|word| word.chars().count() >= 3)
        .filter(|word| result.contains(word))
        .count();
    25 * shared as u32
}

/// Pick the best candidate for `title` by `artist`.
///
/// Both terms are cleaned first. Candidates without any title overlap are
/// discarded; the highest combined score wins, earlier results winning
/// ties. `None` if nothing matches or the winner shares no artist.
pub fn find_best_match<'a>(candidates: &'a [SongCandidate], title: &str, artist: &str) -> Option<&'a SongCandidate> {
    let title = clean_search_term(title);
    let artist = clean_search_term(artist);

    let mut best: Option<(&SongCandidate, u32, u32)> = None;
    for candidate in candidates {
        let title_points = title_score(&candidate.title, &title);
        if title_points == 0 {
            continue;
        }
        let artist_points = artist_score(&candidate.artist, &artist);
        let total = title_points + artist_points;
        if best.is_none_or(|(_, best_total, _)| total > best_total) {
            best = Some((candidate, total, artist_points));
        }
    }

    match best {
        Some((candidate, _, artist_points)) if artist_points > 0 => Some(candidate),
        _ => None,
    }
}
