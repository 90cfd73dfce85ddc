use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::prompt::{build_messages, clean_mood, new_session_id};
use crate::llm::{CompletionOptions, FinishReason, LlmError, LlmProvider};
use crate::playlist::TrackDescriptor;
use crate::recovery::{recover, RecoveryError};
use crate::server::metrics::{record_generation, record_recovery_path};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("mood is empty after cleaning")]
    InvalidMood,

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model provider is rate limiting requests")]
    RateLimited,

    #[error("model provider failed: {0}")]
    Provider(LlmError),

    #[error("could not recover a playlist: {0}")]
    Recovery(RecoveryError),
}

impl GenerationError {
    fn outcome_label(&self) -> &'static str {
        match self {
            GenerationError::InvalidMood => "invalid_mood",
            GenerationError::EmptyResponse => "empty_response",
            GenerationError::RateLimited => "rate_limited",
            GenerationError::Provider(_) => "provider_error",
            GenerationError::Recovery(_) => "recovery_error",
        }
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        if err.is_rate_limited() {
            GenerationError::RateLimited
        } else {
            GenerationError::Provider(err)
        }
    }
}

impl From<RecoveryError> for GenerationError {
    fn from(err: RecoveryError) -> Self {
        match err {
            RecoveryError::EmptyResponse => GenerationError::EmptyResponse,
            other => GenerationError::Recovery(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlaylist {
    pub playlist: Vec<TrackDescriptor>,
    pub mood: String,
    pub source: String,
    pub model: String,
    pub session_id: String,
    /// RFC 3339 timestamp.
    pub generated: String,
}

/// Turns a mood into a validated tracklist with a single model call.
pub struct PlaylistGenerator {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    playlist_length: usize,
}

impl PlaylistGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        options: CompletionOptions,
        playlist_length: usize,
    ) -> Self {
        Self {
            provider,
            options,
            playlist_length,
        }
    }

    pub fn playlist_length(&self) -> usize {
        self.playlist_length
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Generates `count` tracks (or the configured default) for `mood`.
    /// No retry happens here.
    pub async fn generate(
        &self,
        mood: &str,
        count: Option<usize>,
    ) -> Result<GeneratedPlaylist, GenerationError> {
        let result = self.generate_inner(mood, count).await;
        match &result {
            Ok(_) => record_generation("success"),
            Err(err) => record_generation(err.outcome_label()),
        }
        result
    }

    async fn generate_inner(
        &self,
        mood: &str,
        count: Option<usize>,
    ) -> Result<GeneratedPlaylist, GenerationError> {
        let mood = clean_mood(mood);
        if mood.is_empty() {
            return Err(GenerationError::InvalidMood);
        }

        let count = count.unwrap_or(self.playlist_length);
        let session_id = new_session_id();
        info!(
            "Generating playlist for mood \"{}\" ({} tracks, session {})",
            mood, count, session_id
        );

        let today = chrono::Utc::now().date_naive();
        let messages = build_messages(&mood, count, &session_id, today);
        let response = self.provider.complete(&messages, &self.options).await?;

        if response.finish_reason == FinishReason::MaxTokens {
            warn!(
                "Model hit the token limit for session {}, output is likely truncated",
                session_id
            );
        }
        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion token usage"
            );
        }

        let raw = response.message.content;
        let recovered = recover(&raw, count).map_err(|err| {
            warn!("Recovery failed for session {}: {}", session_id, err);
            debug!("Raw model output: {}", raw);
            err
        })?;
        record_recovery_path(recovered.path.as_str());

        info!(
            "Generated {} tracks for session {} via {} parse",
            recovered.tracks.len(),
            session_id,
            recovered.path
        );

        Ok(GeneratedPlaylist {
            playlist: recovered.tracks,
            mood,
            source: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            session_id,
            generated: chrono::Utc::now().to_rfc3339(),
        })
    }
}
