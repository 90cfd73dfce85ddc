//! Clients for the third-party catalogs used to enrich tracks.
//!
//! Both upstreams sit behind traits so the enrichment orchestrator can be
//! handed real clients, placeholders or fakes.

mod spotify;
pub mod title_split;
mod youtube;

pub use spotify::SpotifyClient;
pub use youtube::{parse_iso8601_duration, YoutubeClient};

use crate::config::{SpotifySettings, YoutubeSettings};
use crate::playlist::{CatalogMatch, VideoMatch};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{0} credentials are not configured")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Upstream request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout
        } else if e.is_decode() {
            LookupError::Decode(e.to_string())
        } else {
            LookupError::Http(e.to_string())
        }
    }
}

/// Track-metadata service (popularity, artwork, preview link).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Best match for `title` by `artist`, `Ok(None)` when nothing matched.
    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<CatalogMatch>, LookupError>;
}

/// Video service (playback URL, thumbnail, view count).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait VideoLookup: Send + Sync {
    fn name(&self) -> &str;

    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoMatch>, LookupError>;

    /// Most popular music videos right now.
    async fn trending(&self, max_results: u32) -> Result<Vec<VideoMatch>, LookupError>;
}

/// Stands in for an upstream whose credentials are missing, so the server
/// still starts and enrichment degrades to absent attachments.
pub struct Unconfigured {
    upstream: &'static str,
}

impl Unconfigured {
    pub fn new(upstream: &'static str) -> Self {
        Self { upstream }
    }

    fn error(&self) -> LookupError {
        LookupError::NotConfigured(self.upstream.to_string())
    }
}

#[async_trait]
impl CatalogLookup for Unconfigured {
    fn name(&self) -> &str {
        self.upstream
    }

    async fn search_track(&self, _: &str, _: &str) -> Result<Option<CatalogMatch>, LookupError> {
        Err(self.error())
    }
}

#[async_trait]
impl VideoLookup for Unconfigured {
    fn name(&self) -> &str {
        self.upstream
    }

    async fn search_videos(&self, _: &str, _: u32) -> Result<Vec<VideoMatch>, LookupError> {
        Err(self.error())
    }

    async fn trending(&self, _: u32) -> Result<Vec<VideoMatch>, LookupError> {
        Err(self.error())
    }
}

pub fn create_catalog_lookup(settings: &SpotifySettings) -> Arc<dyn CatalogLookup> {
    match settings.credentials() {
        Some((client_id, client_secret)) => Arc::new(SpotifyClient::new(
            settings.accounts_url.clone(),
            settings.api_url.clone(),
            client_id.to_string(),
            client_secret.to_string(),
        )),
        None => {
            warn!("Spotify credentials missing, catalog matches will be absent");
            Arc::new(Unconfigured::new("spotify"))
        }
    }
}

pub fn create_video_lookup(settings: &YoutubeSettings) -> Arc<dyn VideoLookup> {
    match &settings.api_key {
        Some(api_key) => Arc::new(YoutubeClient::new(
            settings.api_url.clone(),
            api_key.clone(),
            settings.region_code.clone(),
        )),
        None => {
            warn!("YouTube API key missing, video matches will be absent");
            Arc::new(Unconfigured::new("youtube"))
        }
    }
}
