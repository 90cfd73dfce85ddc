use super::types::{CompletionResponse, Message};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,
}

impl LlmError {
    /// Some backends report quota exhaustion as a plain API error.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LlmError::RateLimited => true,
            LlmError::Api { message, .. } => message.contains("rate_limit"),
            _ => false,
        }
    }
}

/// Sampling and transport options for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: Some(0.95),
            max_tokens: Some(3000),
            timeout: Duration::from_secs(60),
        }
    }
}

/// A chat-completion backend.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name, reported as the playlist `source`.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError>;

    /// Cheap reachability probe.
    async fn health_check(&self) -> Result<(), LlmError>;
}

pub(super) fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Connection(e.to_string())
    }
}
