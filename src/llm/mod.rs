//! LLM provider abstraction layer.
//!
//! Playlist generation talks to a `dyn LlmProvider`, so the backend
//! (any OpenAI-compatible API, or a local Ollama) is picked at startup.

mod ollama;
mod openai;
mod provider;
mod types;

pub use ollama::OllamaProvider;
pub use openai::{ApiKeySource, OpenAIProvider};
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};

#[cfg(feature = "mock")]
pub use provider::MockLlmProvider;

use crate::config::{LlmBackend, LlmSettings};
use std::sync::Arc;

pub fn create_provider(settings: &LlmSettings) -> Arc<dyn LlmProvider> {
    match settings.backend {
        LlmBackend::OpenAI => Arc::new(OpenAIProvider::new(
            settings.base_url.clone(),
            settings.model.clone(),
            settings.api_key.clone(),
        )),
        LlmBackend::Ollama => Arc::new(OllamaProvider::new(
            settings.base_url.clone(),
            settings.model.clone(),
        )),
    }
}
