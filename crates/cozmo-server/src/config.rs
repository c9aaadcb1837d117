//! Relay configuration loaded from the environment.
//!
//! Every setting has a default so the relay starts with no environment
//! at all; in that case chat requests get the placeholder reply. Values
//! that are present but malformed are configuration errors.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cozmo_hub::hub::DEFAULT_EVENT_CAPACITY;
use cozmo_hub::HubConfig;
use cozmo_services::{BackendType, LlmBackendConfig, SpeechConfig};

use crate::error::ServerError;
use crate::server::ServerConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-nano-2025-04-14";

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address.
    pub server: ServerConfig,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Directory served under `/assets`.
    pub assets_dir: PathBuf,
    /// Chat backend; `None` when no API key is set.
    pub llm: Option<LlmBackendConfig>,
    /// Speech synthesizer; `None` when TTS is disabled.
    pub speech: Option<SpeechConfig>,
    /// Hub tuning.
    pub hub: HubConfig,
    /// Deadline for a single chat or speech provider call.
    pub adapter_timeout: Duration,
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `SERVER_HOST` -- bind host (default `0.0.0.0`)
    /// - `SERVER_PORT` -- bind port (default `8080`)
    /// - `STATIC_FILES_PATH` -- static root (default `./web/static`)
    /// - `ASSETS_FILES_PATH` -- asset root (default `./web/assets`)
    /// - `OPENAI_API_KEY` -- chat provider key; chat is disabled without it
    /// - `OPENAI_API_URL` -- chat provider base URL
    /// - `OPENAI_MODEL` -- chat model (default `gpt-4.1-nano-2025-04-14`)
    /// - `OPENAI_MAX_TOKENS` -- reply token cap (default `4096`)
    /// - `LLM_BACKEND` -- `openai` (default) or `anthropic`
    /// - `TTS_ENABLED` -- enable speech synthesis (default `true`)
    /// - `TTS_OUTPUT_DIR` -- where MP3 files are written (default `./web/static/tts`)
    /// - `TTS_LANGUAGE` -- synthesis language (default `id`)
    /// - `TTS_PUBLIC_PREFIX` -- URL prefix of the output dir (default `/static/tts`)
    /// - `HUB_EVENT_CAPACITY` -- hub queue depth (default `256`)
    /// - `ADAPTER_TIMEOUT_MS` -- provider call deadline (default `30000`)
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "SERVER_PORT", defaults.port)?,
        };

        let static_dir = PathBuf::from(
            lookup("STATIC_FILES_PATH").unwrap_or_else(|| "./web/static".to_owned()),
        );
        let assets_dir = PathBuf::from(
            lookup("ASSETS_FILES_PATH").unwrap_or_else(|| "./web/assets".to_owned()),
        );

        let llm = match lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()) {
            Some(api_key) => Some(load_llm(&lookup, api_key)?),
            None => None,
        };

        let speech = if parse_or(&lookup, "TTS_ENABLED", true)? {
            let defaults = SpeechConfig::default();
            Some(SpeechConfig {
                endpoint: defaults.endpoint,
                language: lookup("TTS_LANGUAGE").unwrap_or(defaults.language),
                output_dir: lookup("TTS_OUTPUT_DIR").map_or(defaults.output_dir, PathBuf::from),
                public_prefix: lookup("TTS_PUBLIC_PREFIX").unwrap_or(defaults.public_prefix),
            })
        } else {
            None
        };

        let event_capacity = parse_or(&lookup, "HUB_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?;
        if event_capacity == 0 {
            return Err(ServerError::Config(
                "HUB_EVENT_CAPACITY must be at least 1".to_owned(),
            ));
        }

        let timeout_ms: u64 = parse_or(&lookup, "ADAPTER_TIMEOUT_MS", 30_000)?;
        if timeout_ms == 0 {
            return Err(ServerError::Config(
                "ADAPTER_TIMEOUT_MS must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            server,
            static_dir,
            assets_dir,
            llm,
            speech,
            hub: HubConfig { event_capacity },
            adapter_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn load_llm<F>(lookup: &F, api_key: String) -> Result<LlmBackendConfig, ServerError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_type = match lookup("LLM_BACKEND") {
        Some(name) => {
            BackendType::parse(&name).map_err(|e| ServerError::Config(e.to_string()))?
        }
        None => BackendType::OpenAi,
    };
    let default_url = match backend_type {
        BackendType::OpenAi => DEFAULT_OPENAI_URL,
        BackendType::Anthropic => DEFAULT_ANTHROPIC_URL,
    };

    Ok(LlmBackendConfig {
        backend_type,
        api_url: lookup("OPENAI_API_URL").unwrap_or_else(|| default_url.to_owned()),
        api_key,
        model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        max_tokens: parse_or(lookup, "OPENAI_MAX_TOKENS", 4096)?,
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ServerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: core::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid {key}: {e}")))
    })
}
