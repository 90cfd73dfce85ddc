//! Heuristic split of a video title into song title and artist.
//!
//! Patterns are tried in order and the first match wins. Titles that put the
//! artist second, or use separators not listed here, will be mis-split; there
//! is no confidence score.

use lazy_static::lazy_static;
use regex::Regex;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Trailing `(Official Video)` / `[Lyrics]` decorations.
const DECORATIONS: &str = r"(?:\s*\(.*\))?(?:\s*\[.*\])?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    ArtistFirst,
    TitleFirst,
}

lazy_static! {
    static ref PATTERNS: Vec<(Regex, Order)> = vec![
        (split_pattern(r"\s*-\s*"), Order::ArtistFirst),
        (split_pattern(r"\s*–\s*"), Order::ArtistFirst),
        (split_pattern(r"(?i:\s+by\s+)"), Order::TitleFirst),
        (split_pattern(r"\s*\|\s*"), Order::ArtistFirst),
    ];
}

fn split_pattern(separator: &str) -> Regex {
    Regex::new(&format!(r"^(.+?){}(.+?){}", separator, DECORATIONS)).expect("title split regex")
}

/// Returns `(title, artist)`.
pub fn split_title(full_title: &str) -> (String, String) {
    let full_title = full_title.trim();
    for (pattern, order) in PATTERNS.iter() {
        let Some(captures) = pattern.captures(full_title) else {
            continue;
        };
        let first = captures[1].trim();
        let second = captures[2].trim();
        if first.is_empty() || second.is_empty() {
            continue;
        }
        return match order {
            Order::ArtistFirst => (second.to_string(), first.to_string()),
            Order::TitleFirst => (first.to_string(), second.to_string()),
        };
    }
    (full_title.to_string(), UNKNOWN_ARTIST.to_string())
}
