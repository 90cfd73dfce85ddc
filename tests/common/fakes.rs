//! Fake model provider and upstream lookups
//!
//! Each fake is configured up front and never touches the network, so tests
//! can pick exactly which upstream is healthy, empty, failing or slow.

use super::constants::*;
use async_trait::async_trait;
use moodlist_server::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
};
use moodlist_server::playlist::{CatalogMatch, VideoMatch};
use moodlist_server::upstream::{CatalogLookup, LookupError, VideoLookup};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Model provider that answers every completion with the same canned text.
pub struct FakeLlmProvider {
    reply: Result<String, LlmError>,
    calls: AtomicUsize,
}

impl FakeLlmProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: LlmError) -> Self {
        Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeLlmProvider {
    fn name(&self) -> &str {
        FAKE_LLM_NAME
    }

    fn model(&self) -> &str {
        FAKE_LLM_MODEL
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse {
            message: Message::assistant(self.reply.clone()?),
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        self.reply.clone().map(|_| ())
    }
}

/// How a fake upstream behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// Finds a match for everything except [`UNKNOWN_TITLE`].
    Healthy,
    /// Every call errors, as if the service were down.
    Down,
}

pub struct FakeCatalog {
    mode: UpstreamMode,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(mode: UpstreamMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn catalog_id(title: &str) -> String {
    format!("catalog-{}", title.to_lowercase().replace(' ', "-"))
}

#[async_trait]
impl CatalogLookup for FakeCatalog {
    fn name(&self) -> &str {
        FAKE_CATALOG_NAME
    }

    async fn search_track(
        &self,
        title: &str,
        _artist: &str,
    ) -> Result<Option<CatalogMatch>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.mode == UpstreamMode::Down {
            return Err(LookupError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        if title == UNKNOWN_TITLE {
            return Ok(None);
        }
        let id = catalog_id(title);
        Ok(Some(CatalogMatch {
            external_url: format!("https://open.spotify.com/track/{}", id),
            id,
            preview_url: None,
            popularity: 42,
            release_date: "2024-03-01".to_string(),
            artwork_url: Some("https://i.scdn.co/image/cover".to_string()),
            duration_ms: 201_000,
        }))
    }
}

pub struct FakeVideo {
    mode: UpstreamMode,
}

impl FakeVideo {
    pub fn new(mode: UpstreamMode) -> Self {
        Self { mode }
    }
}

pub fn video_id(query: &str) -> String {
    format!("video-{}", query.to_lowercase().replace(' ', "-"))
}

fn fake_video(id: String, title: &str) -> VideoMatch {
    VideoMatch {
        video_url: format!("https://www.youtube.com/watch?v={}", id),
        id,
        title: title.to_string(),
        artist: "Fake Channel".to_string(),
        description: String::new(),
        thumbnail_url: "https://i.ytimg.com/vi/fake/hqdefault.jpg".to_string(),
        published_at: "2024-01-01T00:00:00Z".to_string(),
        view_count: 1_000,
        duration: "PT3M21S".to_string(),
        duration_secs: Some(201),
    }
}

#[async_trait]
impl VideoLookup for FakeVideo {
    fn name(&self) -> &str {
        FAKE_VIDEO_NAME
    }

    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoMatch>, LookupError> {
        if self.mode == UpstreamMode::Down {
            return Err(LookupError::Http("connection refused".to_string()));
        }
        if query.starts_with(SLOW_TITLE) {
            tokio::time::sleep(Duration::from_millis(UPSTREAM_TIMEOUT_MS * 10)).await;
        }
        if query.starts_with(UNKNOWN_TITLE) {
            return Ok(Vec::new());
        }
        let mut videos = vec![fake_video(video_id(query), query)];
        videos.truncate(max_results as usize);
        Ok(videos)
    }

    async fn trending(&self, max_results: u32) -> Result<Vec<VideoMatch>, LookupError> {
        if self.mode == UpstreamMode::Down {
            return Err(LookupError::Http("connection refused".to_string()));
        }
        Ok((0..max_results.min(FAKE_TRENDING_COUNT))
            .map(|i| fake_video(format!("trending-{}", i), &format!("Hit {}", i)))
            .collect())
    }
}
