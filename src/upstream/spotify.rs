//! Spotify Web API client using the client-credentials flow.

use super::{CatalogLookup, LookupError};
use crate::playlist::CatalogMatch;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens are refreshed this long before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

pub struct SpotifyClient {
    http: Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        accounts_url: String,
        api_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http: Client::new(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: Mutex::new(None),
        }
    }

    /// Returns the cached token or fetches a new one. The lock is held across
    /// the refresh so concurrent lookups share a single token request.
    async fn access_token(&self) -> Result<String, LookupError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken, LookupError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Auth(format!(
                "token request failed with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        info!("Obtained Spotify access token valid for {}s", token.expires_in);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    async fn search_once(&self, query: &str) -> Result<reqwest::Response, LookupError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await?;
        Ok(response)
    }
}

pub(super) fn search_query(title: &str, artist: &str) -> String {
    format!("track:\"{}\" artist:\"{}\"", title, artist)
}

#[async_trait]
impl CatalogLookup for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<CatalogMatch>, LookupError> {
        let query = search_query(title, artist);
        debug!("Spotify search: {}", query);

        let mut response = self.search_once(&query).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Spotify rejected the cached token, refreshing");
            self.clear_token().await;
            response = self.search_once(&query).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(LookupError::Auth("search rejected the access token".to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        parse_search_response(&body)
    }
}

fn parse_search_response(body: &str) -> Result<Option<CatalogMatch>, LookupError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    let track = match parsed.tracks.and_then(|page| page.items.into_iter().next()) {
        Some(track) => track,
        None => return Ok(None),
    };

    Ok(Some(CatalogMatch {
        external_url: track
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("https://open.spotify.com/track/{}", track.id)),
        id: track.id,
        preview_url: track.preview_url,
        popularity: track.popularity,
        release_date: track.album.release_date,
        artwork_url: track.album.images.into_iter().next().map(|i| i.url),
        duration_ms: track.duration_ms,
    }))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    #[serde(default)]
    external_urls: ExternalUrls,
    preview_url: Option<String>,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    duration_ms: u64,
    album: SpotifyAlbum,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}
