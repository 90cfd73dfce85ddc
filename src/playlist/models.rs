use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Reasoning used when the model did not explain its pick.
pub const DEFAULT_REASONING: &str = "Selected to match your mood";

const MIN_RELEASE_YEAR: i64 = 1900;

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// A single track as identified by the model, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub release_year: i32,
    /// URL-component encoding of `"{title} {artist}"`.
    pub search_query: String,
    pub reasoning: String,
}

impl TrackDescriptor {
    /// Builds a descriptor from loosely validated parts.
    ///
    /// Returns `None` when either `title` or `artist` is blank after trimming.
    /// A missing or implausible release year falls back to the current year.
    pub fn new(
        title: &str,
        artist: &str,
        release_year: Option<i64>,
        reasoning: Option<&str>,
    ) -> Option<Self> {
        let title = title.trim();
        let artist = artist.trim();
        if title.is_empty() || artist.is_empty() {
            return None;
        }

        let search_query = urlencoding::encode(&format!("{} {}", title, artist)).into_owned();
        let reasoning = reasoning
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASONING);

        Some(Self {
            title: title.to_string(),
            artist: artist.to_string(),
            release_year: plausible_year(release_year),
            search_query,
            reasoning: reasoning.to_string(),
        })
    }

    /// Free-text query used against the video service.
    pub fn plain_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

fn plausible_year(year: Option<i64>) -> i32 {
    let now = current_year();
    match year {
        Some(y) if (MIN_RELEASE_YEAR..=now as i64 + 1).contains(&y) => y as i32,
        _ => now,
    }
}

/// Best match found on the track-metadata service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMatch {
    pub id: String,
    pub external_url: String,
    pub preview_url: Option<String>,
    pub popularity: u32,
    pub release_date: String,
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
}

/// Best match found on the video service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMatch {
    pub id: String,
    /// Title re-parsed from the video's own title string.
    pub title: String,
    /// Artist re-parsed from the video's own title string.
    pub artist: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub published_at: String,
    pub view_count: u64,
    /// ISO-8601 duration as reported, e.g. `PT3M21S`.
    pub duration: String,
    pub duration_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrack {
    #[serde(flatten)]
    pub descriptor: TrackDescriptor,
    pub catalog_match: Option<CatalogMatch>,
    pub video_match: Option<VideoMatch>,
}

impl EnrichedTrack {
    /// A track with both attachments absent.
    pub fn bare(descriptor: TrackDescriptor) -> Self {
        Self {
            descriptor,
            catalog_match: None,
            video_match: None,
        }
    }
}
