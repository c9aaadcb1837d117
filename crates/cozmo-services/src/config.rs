//! Configuration types for the provider adapters.
//!
//! These are plain values; reading them from the environment is the
//! server's job.

use std::path::PathBuf;

/// Base URL of the Google Translate TTS endpoint.
pub const GOOGLE_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Errors raised while interpreting adapter configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is not one the adapters understand.
    #[error("invalid value for {key}: {value}")]
    Invalid {
        /// Name of the offending setting.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g. `gpt-4.1-nano-2025-04-14`).
    pub model: String,
    /// Upper bound on generated tokens per reply.
    pub max_tokens: u32,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in configuration.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            _ => Err(ConfigError::Invalid {
                key: "LLM_BACKEND",
                value: name.to_owned(),
            }),
        }
    }
}

/// Configuration for the speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// TTS endpoint URL.
    pub endpoint: String,
    /// Language code passed to the provider (e.g. `id`, `en`).
    pub language: String,
    /// Directory the MP3 files are written to.
    pub output_dir: PathBuf,
    /// URL prefix under which `output_dir` is served (e.g. `/static/tts`).
    pub public_prefix: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: GOOGLE_TTS_ENDPOINT.to_owned(),
            language: String::from("id"),
            output_dir: PathBuf::from("./web/static/tts"),
            public_prefix: String::from("/static/tts"),
        }
    }
}
