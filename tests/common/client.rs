//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per route. When routes or request formats
//! change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    pub async fn generate(&self, mood: &str, count: Option<usize>) -> Response {
        let mut body = json!({ "mood": mood });
        if let Some(count) = count {
            body["count"] = json!(count);
        }
        self.generate_raw(body).await
    }

    pub async fn generate_raw(&self, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/playlist/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Generate request failed")
    }

    pub async fn enrich(&self, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/playlist/enrich", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Enrich request failed")
    }

    pub async fn lookup(&self, title: Option<&str>, artist: Option<&str>) -> Response {
        self.lookup_at("/v1/playlist/lookup", title, artist).await
    }

    // ========================================================================
    // Catalog-only Endpoints
    // ========================================================================

    pub async fn catalog_enrich(&self, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/catalog/enrich", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Catalog enrich request failed")
    }

    pub async fn catalog_lookup(&self, title: &str, artist: &str) -> Response {
        self.lookup_at("/v1/catalog/lookup", Some(title), Some(artist))
            .await
    }

    // ========================================================================
    // Trending
    // ========================================================================

    pub async fn trending(&self, limit: Option<u32>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/v1/trending/videos", self.base_url));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().await.expect("Trending request failed")
    }

    async fn lookup_at(&self, path: &str, title: Option<&str>, artist: Option<&str>) -> Response {
        let mut params = Vec::new();
        if let Some(title) = title {
            params.push(("title", title));
        }
        if let Some(artist) = artist {
            params.push(("artist", artist));
        }
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(&params)
            .send()
            .await
            .expect("Lookup request failed")
    }
}
