mod file_config;

pub use file_config::{EnrichmentConfig, FileConfig, LlmConfig, SpotifyConfig, YoutubeConfig};

use crate::llm::{ApiKeySource, CompletionOptions};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_REGION_CODE: &str = "US";
pub const DEFAULT_PLAYLIST_LENGTH: usize = 10;
pub const MAX_PLAYLIST_LENGTH: usize = 25;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub playlist_length: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            frontend_dir_path: None,
            playlist_length: DEFAULT_PLAYLIST_LENGTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub playlist_length: usize,

    pub llm: LlmSettings,
    pub spotify: SpotifySettings,
    pub youtube: YoutubeSettings,
    pub enrichment: EnrichmentSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub base_url: String,
    pub model: String,
    pub api_key: ApiKeySource,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            top_p: Some(self.top_p),
            max_tokens: Some(self.max_tokens),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub accounts_url: String,
    pub api_url: String,
}

impl SpotifySettings {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YoutubeSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub region_code: String,
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_concurrent: 5,
        }
    }
}

impl EnrichmentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present. Secrets missing from
    /// the file are read from the environment.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file_config, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env<F>(cli: &CliConfig, file_config: Option<FileConfig>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file_config.unwrap_or_default();
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let playlist_length = file.playlist_length.unwrap_or(cli.playlist_length);
        if !(1..=MAX_PLAYLIST_LENGTH).contains(&playlist_length) {
            bail!(
                "playlist_length must be between 1 and {}, got {}",
                MAX_PLAYLIST_LENGTH,
                playlist_length
            );
        }

        let llm_file = file.llm.unwrap_or_default();
        let backend = match llm_file.backend.as_deref() {
            None | Some("openai") => LlmBackend::OpenAI,
            Some("ollama") => LlmBackend::Ollama,
            Some(other) => bail!("Unknown LLM backend: {}", other),
        };
        let (default_base_url, default_model) = match backend {
            LlmBackend::OpenAI => (DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL),
            LlmBackend::Ollama => (DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL),
        };
        let api_key = if let Some(key) = llm_file.api_key {
            ApiKeySource::Static(key)
        } else if let Some(cmd) = llm_file.api_key_command {
            ApiKeySource::Command(cmd)
        } else if let Some(key) = env("LLM_API_KEY").or_else(|| env("GROQ_API_KEY")) {
            ApiKeySource::Static(key)
        } else {
            ApiKeySource::None
        };
        let llm = LlmSettings {
            backend,
            base_url: llm_file
                .base_url
                .unwrap_or_else(|| default_base_url.to_string()),
            model: llm_file.model.unwrap_or_else(|| default_model.to_string()),
            api_key,
            temperature: llm_file.temperature.unwrap_or(0.8),
            top_p: llm_file.top_p.unwrap_or(0.95),
            max_tokens: llm_file.max_tokens.unwrap_or(3000),
            timeout_secs: llm_file.timeout_secs.unwrap_or(60),
        };

        let spotify_file = file.spotify.unwrap_or_default();
        let spotify = SpotifySettings {
            client_id: spotify_file
                .client_id
                .or_else(|| env("SPOTIFY_CLIENT_ID")),
            client_secret: spotify_file
                .client_secret
                .or_else(|| env("SPOTIFY_CLIENT_SECRET")),
            accounts_url: spotify_file
                .accounts_url
                .unwrap_or_else(|| DEFAULT_SPOTIFY_ACCOUNTS_URL.to_string()),
            api_url: spotify_file
                .api_url
                .unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string()),
        };

        let youtube_file = file.youtube.unwrap_or_default();
        let youtube = YoutubeSettings {
            api_key: youtube_file.api_key.or_else(|| env("YOUTUBE_API_KEY")),
            api_url: youtube_file
                .api_url
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_URL.to_string()),
            region_code: youtube_file
                .region_code
                .unwrap_or_else(|| DEFAULT_REGION_CODE.to_string()),
        };

        let enrichment_file = file.enrichment.unwrap_or_default();
        let enrichment_defaults = EnrichmentSettings::default();
        let enrichment = EnrichmentSettings {
            timeout_secs: enrichment_file
                .timeout_secs
                .unwrap_or(enrichment_defaults.timeout_secs),
            max_concurrent: enrichment_file
                .max_concurrent
                .unwrap_or(enrichment_defaults.max_concurrent),
        };
        if enrichment.max_concurrent == 0 {
            bail!("enrichment.max_concurrent must be at least 1");
        }

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            playlist_length,
            llm,
            spotify,
            youtube,
            enrichment,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
