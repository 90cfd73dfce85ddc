//! YouTube Data API v3 client for music videos.

use super::title_split::split_title;
use super::{LookupError, VideoLookup};
use crate::playlist::VideoMatch;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// YouTube's "Music" video category.
const MUSIC_CATEGORY_ID: &str = "10";
const MAX_RESULTS_CAP: u32 = 50;

lazy_static! {
    static ref ISO8601_DURATION: Regex = Regex::new(
        r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$"
    )
    .expect("duration regex");
}

/// Parses durations like `PT3M21S` or `P1DT2H` into seconds.
pub fn parse_iso8601_duration(duration: &str) -> Option<u64> {
    if duration.len() < 2 || duration == "PT" {
        return None;
    }
    let captures = ISO8601_DURATION.captures(duration)?;
    let part = |i: usize| -> u64 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(part(1) * 604_800 + part(2) * 86_400 + part(3) * 3_600 + part(4) * 60 + part(5))
}

pub struct YoutubeClient {
    http: Client,
    api_url: String,
    api_key: String,
    region_code: String,
}

impl YoutubeClient {
    pub fn new(api_url: String, api_key: String, region_code: String) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            region_code,
        }
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, LookupError> {
        let response = self
            .http
            .get(format!("{}/{}", self.api_url, endpoint))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.text().await?)
    }

    async fn videos_by_id(&self, ids: &[String]) -> Result<Vec<VideoMatch>, LookupError> {
        let joined = ids.join(",");
        let body = self
            .get(
                "videos",
                &[("part", "statistics,contentDetails,snippet"), ("id", joined.as_str())],
            )
            .await?;
        let mut videos = parse_video_list(&body)?;
        // videos.list does not promise to keep the requested order
        videos.sort_by_key(|v| ids.iter().position(|id| *id == v.id).unwrap_or(usize::MAX));
        Ok(videos)
    }
}

#[async_trait]
impl VideoLookup for YoutubeClient {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoMatch>, LookupError> {
        let q = format!("{} music video song", query);
        let max_results = max_results.clamp(1, MAX_RESULTS_CAP).to_string();
        debug!("YouTube search: {}", q);

        let body = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", q.as_str()),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                    ("videoCategoryId", MUSIC_CATEGORY_ID),
                    ("order", "relevance"),
                    ("safeSearch", "none"),
                ],
            )
            .await?;

        let ids = parse_search_ids(&body)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.videos_by_id(&ids).await
    }

    async fn trending(&self, max_results: u32) -> Result<Vec<VideoMatch>, LookupError> {
        let max_results = max_results.clamp(1, MAX_RESULTS_CAP).to_string();
        let body = self
            .get(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("chart", "mostPopular"),
                    ("videoCategoryId", MUSIC_CATEGORY_ID),
                    ("regionCode", self.region_code.as_str()),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;
        parse_video_list(&body)
    }
}

fn parse_search_ids(body: &str) -> Result<Vec<String>, LookupError> {
    let parsed: SearchListResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    Ok(parsed
        .items
        .into_iter()
        .filter_map(|item| item.id.video_id)
        .filter(|id| !id.is_empty())
        .collect())
}

fn parse_video_list(body: &str) -> Result<Vec<VideoMatch>, LookupError> {
    let parsed: VideoListResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    Ok(parsed.items.into_iter().filter_map(video_match).collect())
}

fn video_match(item: VideoItem) -> Option<VideoMatch> {
    let snippet = item.snippet?;
    let (title, artist) = split_title(&snippet.title);
    let thumbnail_url = snippet
        .thumbnails
        .high
        .or(snippet.thumbnails.default)
        .map(|t| t.url)
        .unwrap_or_default();
    let view_count = item
        .statistics
        .and_then(|s| s.view_count)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let duration = item
        .content_details
        .and_then(|c| c.duration)
        .unwrap_or_default();

    Some(VideoMatch {
        video_url: format!("https://www.youtube.com/watch?v={}", item.id),
        id: item.id,
        title,
        artist,
        description: snippet.description,
        thumbnail_url,
        published_at: snippet.published_at,
        view_count,
        duration_secs: parse_iso8601_duration(&duration),
        duration,
    })
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    /// Sent as a string by the API.
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}
