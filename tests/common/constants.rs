//! Shared constants for end-to-end tests
//!
//! When canned model output or fake upstream data changes, update only this file.

// ============================================================================
// Canned Model Output
// ============================================================================

/// Two well-formed tracks
pub const TWO_TRACKS_JSON: &str = r#"[
  {"title": "Song A", "artist": "Artist X", "releaseYear": 2024, "searchQuery": "Song A Artist X", "reasoning": "Upbeat"},
  {"title": "Song B", "artist": "Artist Y", "releaseYear": 2023, "searchQuery": "Song B Artist Y", "reasoning": "Warm"}
]"#;

/// Prose and a fence around single-quoted JSON with a trailing comma
pub const PROSE_WRAPPED_REPLY: &str = "Sure! Here you go:\n```json\n[{'title': 'Song A', 'artist': 'Artist X', 'releaseYear': 2024, 'reasoning': 'Upbeat'},]\n```";

/// Output cut off in the middle of the third element
pub const TRUNCATED_REPLY: &str = r#"[{"title": "Song A", "artist": "Artist X", "releaseYear": 2024},
{"title": "Song B", "artist": "Artist Y", "releaseYear": 2023},
{"title": "Song C", "art"#;

/// Valid objects scattered through prose, no array at all
pub const FRAGMENTS_REPLY: &str = r#"My first pick is {"title": "Song A", "artist": "Artist X"} and then
I would add {"title": "Song B", "artist": "Artist Y", "reasoning": "calm"} to close."#;

// ============================================================================
// Track Data
// ============================================================================

pub const TRACK_A_TITLE: &str = "Song A";
pub const TRACK_A_ARTIST: &str = "Artist X";
pub const TRACK_B_TITLE: &str = "Song B";
pub const TRACK_B_ARTIST: &str = "Artist Y";

/// Title the fake catalog never finds
pub const UNKNOWN_TITLE: &str = "Nothing Matches This";

/// Title for which the fake video service takes too long
pub const SLOW_TITLE: &str = "Slow Song";

// ============================================================================
// Fake Upstream Data
// ============================================================================

pub const FAKE_LLM_NAME: &str = "fake-llm";
pub const FAKE_LLM_MODEL: &str = "fake-model-1";
pub const FAKE_CATALOG_NAME: &str = "fake-catalog";
pub const FAKE_VIDEO_NAME: &str = "fake-video";

/// Number of trending videos the fake video service knows about
pub const FAKE_TRENDING_COUNT: u32 = 60;

// ============================================================================
// Timeouts
// ============================================================================

/// Upstream timeout configured on the test enricher (milliseconds)
pub const UPSTREAM_TIMEOUT_MS: u64 = 300;

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
