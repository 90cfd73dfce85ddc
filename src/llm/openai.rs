//! OpenAI-compatible chat completions provider.
//!
//! Works with Groq, OpenAI, OpenRouter, vLLM and any other service
//! implementing the `/chat/completions` API.

use super::provider::{map_send_error, CompletionOptions, LlmError, LlmProvider};
use super::types::{CompletionResponse, FinishReason, Message, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const API_KEY_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the bearer token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    None,
    Static(String),
    /// Shell command printing the key, run before every request.
    Command(String),
}

impl ApiKeySource {
    async fn get_key(&self) -> Result<Option<String>, LlmError> {
        match self {
            ApiKeySource::None => Ok(None),
            ApiKeySource::Static(key) => Ok(Some(key.clone())),
            ApiKeySource::Command(cmd) => {
                debug!(command = %cmd, "Fetching API key via command");

                let result = tokio::time::timeout(
                    API_KEY_COMMAND_TIMEOUT,
                    Command::new("sh").arg("-c").arg(cmd).output(),
                )
                .await;

                let output = match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        warn!(command = %cmd, error = %e, "api_key_command failed to execute");
                        return Err(LlmError::Connection(format!(
                            "Failed to execute api_key_command: {}",
                            e
                        )));
                    }
                    Err(_) => {
                        warn!(command = %cmd, "api_key_command timed out");
                        return Err(LlmError::Timeout);
                    }
                };

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(LlmError::Connection(format!(
                        "api_key_command exited with {}: {}",
                        output.status, stderr
                    )));
                }

                let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if key.is_empty() {
                    return Err(LlmError::Connection(
                        "api_key_command returned empty key".to_string(),
                    ));
                }
                Ok(Some(key))
            }
        }
    }
}

pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key_source: ApiKeySource,
}

impl OpenAIProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_source: ApiKeySource,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key_source,
        }
    }

    fn build_request(&self, messages: &[Message], options: &CompletionOptions) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: Some(options.temperature),
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(messages, options);

        debug!(
            model = %self.model,
            message_count = messages.len(),
            "Sending completion request to OpenAI-compatible API"
        );

        let mut req_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = self.api_key_source.get_key().await? {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .timeout(options.timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.map_err(map_send_error)?;
        parse_chat_response(&body)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/models", self.base_url);
        let mut req_builder = self.client.get(&url).timeout(HEALTH_CHECK_TIMEOUT);
        if let Some(api_key) = self.api_key_source.get_key().await? {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder.send().await.map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(LlmError::Api {
                status: response.status().as_u16(),
                message: "Health check failed".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_chat_response(body: &str) -> Result<CompletionResponse, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("length") => FinishReason::MaxTokens,
        Some("stop") | None => FinishReason::Stop,
        Some(other) => {
            debug!("Unrecognised finish_reason {}", other);
            FinishReason::Stop
        }
    };

    let usage = parsed.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        message: Message::assistant(choice.message.content.unwrap_or_default()),
        finish_reason,
        usage,
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        ChatMessage {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_sampling_options() {
        let provider = OpenAIProvider::new("https://api.groq.com/openai/v1/", "m", ApiKeySource::None);
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");

        let request = provider.build_request(
            &[Message::system("s"), Message::user("u")],
            &CompletionOptions::default(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["max_tokens"], 3000);
        assert_eq!(json["stream"], false);
        assert!((json["top_p"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response_with_length_finish() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "[{\"title\":"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3000, "total_tokens": 3010}
        }"#;
        let response = parse_chat_response(body).unwrap();
        assert_eq!(response.finish_reason, FinishReason::MaxTokens);
        assert_eq!(response.message.content, "[{\"title\":");
        assert_eq!(response.usage.unwrap().total_tokens, 3010);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = parse_chat_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_null_content_becomes_empty() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": "stop"}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().message.content, "");
    }

    #[tokio::test]
    async fn test_api_key_command() {
        let source = ApiKeySource::Command("echo secret-token".to_string());
        assert_eq!(source.get_key().await.unwrap(), Some("secret-token".to_string()));

        let empty = ApiKeySource::Command("true".to_string());
        assert!(empty.get_key().await.is_err());
    }
}
