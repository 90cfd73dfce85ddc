//! End-to-end tests for playlist generation
//!
//! Covers recovery of messy model output, request validation and the
//! mapping of generation failures to HTTP statuses.

mod common;

use common::{
    FakeLlmProvider, Fakes, TestClient, TestServer, FAKE_LLM_MODEL, FAKE_LLM_NAME,
    FRAGMENTS_REPLY, PROSE_WRAPPED_REPLY, TRUNCATED_REPLY,
};
use moodlist_server::llm::LlmError;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn spawn_replying(reply: &str) -> (TestServer, TestClient) {
    let server = TestServer::spawn_with(Fakes::default().with_llm(FakeLlmProvider::replying(reply))).await;
    let client = TestClient::new(server.base_url.clone());
    (server, client)
}

fn titles(body: &Value) -> Vec<String> {
    body["playlist"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Home
// =============================================================================

#[tokio::test]
async fn test_home_reports_uptime_and_version() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["uptime"].as_str().unwrap().starts_with("0d "));
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_provider() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], FAKE_LLM_NAME);
    assert_eq!(body["model"], FAKE_LLM_MODEL);
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn test_generate_well_formed_reply() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate("sunny road trip", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(titles(&body), vec!["Song A", "Song B"]);
    assert_eq!(body["mood"], "sunny road trip");
    assert_eq!(body["source"], FAKE_LLM_NAME);
    assert_eq!(body["model"], FAKE_LLM_MODEL);
    assert!(body["sessionId"].as_str().unwrap().contains('_'));
    assert!(body["generated"].is_string());

    let first = &body["playlist"][0];
    assert_eq!(first["artist"], "Artist X");
    assert_eq!(first["releaseYear"], 2024);
    assert_eq!(first["searchQuery"], "Song%20A%20Artist%20X");
    assert_eq!(first["reasoning"], "Upbeat");
    assert_eq!(server.llm.calls(), 1);
}

#[tokio::test]
async fn test_generate_recovers_prose_wrapped_single_quotes() {
    let (_server, client) = spawn_replying(PROSE_WRAPPED_REPLY).await;

    let response = client.generate("happy", Some(1)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let playlist = body["playlist"].as_array().unwrap();
    assert_eq!(playlist.len(), 1);
    assert_eq!(playlist[0]["title"], "Song A");
    assert_eq!(playlist[0]["artist"], "Artist X");
    assert_eq!(playlist[0]["releaseYear"], 2024);
}

#[tokio::test]
async fn test_generate_repairs_truncated_reply() {
    let (_server, client) = spawn_replying(TRUNCATED_REPLY).await;

    let response = client.generate("late night drive", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(titles(&body), vec!["Song A", "Song B"]);
}

#[tokio::test]
async fn test_generate_falls_back_to_fragments() {
    let (_server, client) = spawn_replying(FRAGMENTS_REPLY).await;

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(titles(&body), vec!["Song A", "Song B"]);
    assert_eq!(body["playlist"][1]["reasoning"], "calm");
}

#[tokio::test]
async fn test_generate_keeps_first_n_tracks() {
    let reply = json!([
        {"title": "One", "artist": "A"},
        {"title": "", "artist": "Skipped"},
        {"title": "Two", "artist": "B"},
        {"title": "Three", "artist": "C"}
    ])
    .to_string();
    let (_server, client) = spawn_replying(&reply).await;

    let response = client.generate("focus", Some(2)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(titles(&body), vec!["One", "Two"]);
}

#[tokio::test]
async fn test_generate_strips_emoji_from_mood() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate("🌧️ rainy   day ☔", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["mood"], "rainy day");
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn test_generate_rejects_emoji_only_mood_without_calling_model() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate("🎉🎉", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid mood");
    assert_eq!(server.llm.calls(), 0);
}

#[tokio::test]
async fn test_generate_rejects_out_of_range_count() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for count in [0, 26, 100] {
        let response = client.generate("calm", Some(count)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "count {}", count);
    }
    assert_eq!(server.llm.calls(), 0);
}

#[tokio::test]
async fn test_generate_rejects_missing_mood() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate_raw(json!({ "count": 3 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid request");
}

// =============================================================================
// Failure Mapping
// =============================================================================

#[tokio::test]
async fn test_empty_model_reply_is_bad_gateway() {
    let (_server, client) = spawn_replying("").await;

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to generate playlist");
    assert_eq!(body["details"], "model returned an empty response");
}

#[tokio::test]
async fn test_unrecoverable_reply_is_bad_gateway() {
    let (_server, client) = spawn_replying("I cannot help with playlists today.").await;

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_reply_without_usable_tracks_is_bad_gateway() {
    let (_server, client) = spawn_replying(r#"[{"title": "No artist"}, {"artist": "No title"}]"#).await;

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json().await.unwrap();
    assert!(body["details"].as_str().unwrap().contains("2"));
}

#[tokio::test]
async fn test_rate_limited_provider_is_429() {
    let fakes = Fakes::default().with_llm(FakeLlmProvider::failing(LlmError::Api {
        status: 400,
        message: "rate_limit_exceeded: try again later".to_string(),
    }));
    let server = TestServer::spawn_with(fakes).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_provider_outage_is_bad_gateway() {
    let fakes = Fakes::default().with_llm(FakeLlmProvider::failing(LlmError::Connection(
        "connection refused".to_string(),
    )));
    let server = TestServer::spawn_with(fakes).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate("calm", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
