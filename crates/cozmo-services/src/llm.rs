//! LLM chat responders.
//!
//! Uses enum dispatch over the concrete HTTP backends and implements
//! [`ChatResponder`] once on the enum, so the hub sees a single
//! capability regardless of which provider is configured.
//!
//! Conversation history is replayed as alternating user/assistant turns
//! followed by the new prompt.

use async_trait::async_trait;
use cozmo_hub::adapter::{AdapterError, ChatMessage, ChatResponder};
use serde_json::{json, Value};

use crate::config::{BackendType, LlmBackendConfig};

/// Sampling temperature used for every request.
const TEMPERATURE: f64 = 0.7;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that answers chat prompts.
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Human-readable name for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

#[async_trait]
impl ChatResponder for LlmBackend {
    async fn respond(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, AdapterError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt, history).await,
            Self::Anthropic(backend) => backend.complete(prompt, history).await,
        }
    }

    fn name(&self) -> &str {
        self.label()
    }
}

/// Build the role/content message list shared by both APIs.
fn conversation(prompt: &str, history: &[ChatMessage]) -> Vec<Value> {
    history
        .iter()
        .map(|turn| {
            let role = if turn.is_bot { "assistant" } else { "user" };
            json!({"role": role, "content": turn.content})
        })
        .chain(std::iter::once(json!({"role": "user", "content": prompt})))
        .collect()
}

/// Turn a non-success provider response into an error carrying its body.
async fn reject(provider: &str, response: reqwest::Response) -> AdapterError {
    let status = response.status();
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_owned());
    AdapterError::Request(format!("{provider} returned {status}: {error_body}"))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for `OpenAI`-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, AdapterError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = json!({
            "model": self.model,
            "messages": conversation(prompt, history),
            "temperature": TEMPERATURE,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Request(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("OpenAI", response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Response(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, AdapterError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            AdapterError::Response("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Uses the `x-api-key` header and reads `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    async fn complete(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, AdapterError> {
        let url = format!("{}/messages", self.api_url);

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
            "messages": conversation(prompt, history),
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Request(format!("Anthropic request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(reject("Anthropic", response).await);
        }

        let json: Value = response.json().await.map_err(|e| {
            AdapterError::Response(format!("Anthropic response parse failed: {e}"))
        })?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &Value) -> Result<String, AdapterError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| AdapterError::Response("Anthropic response missing content[0].text".to_owned()))
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = json!({"choices": [{"message": {"content": "Beep boop, hello!"}}]});
        assert_eq!(
            extract_openai_content(&json).unwrap_or_default(),
            "Beep boop, hello!"
        );
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = json!({"content": [{"type": "text", "text": "I can lift cubes."}]});
        assert_eq!(
            extract_anthropic_content(&json).unwrap_or_default(),
            "I can lift cubes."
        );
    }

    #[test]
    fn extract_anthropic_content_missing() {
        assert!(extract_anthropic_content(&json!({"content": []})).is_err());
    }

    #[test]
    fn conversation_replays_history_then_prompt() {
        let history = vec![
            ChatMessage {
                content: "hi".to_owned(),
                ..ChatMessage::default()
            },
            ChatMessage {
                content: "hello human".to_owned(),
                is_bot: true,
                ..ChatMessage::default()
            },
        ];
        let messages = conversation("what can you do?", &history);
        assert_eq!(
            messages,
            vec![
                json!({"role": "user", "content": "hi"}),
                json!({"role": "assistant", "content": "hello human"}),
                json!({"role": "user", "content": "what can you do?"}),
            ]
        );
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let mut config = LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "https://api.openai.com/v1".to_owned(),
            api_key: "test".to_owned(),
            model: "test-model".to_owned(),
            max_tokens: 256,
        };
        assert_eq!(create_backend(&config).label(), "openai-compatible");

        config.backend_type = BackendType::Anthropic;
        assert_eq!(create_backend(&config).label(), "anthropic");
    }
}
