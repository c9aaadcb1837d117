//! External service capabilities and the hub's fallback policy.
//!
//! The hub talks to two optional collaborators: a [`ChatResponder`] that
//! turns a prompt into text, and a [`SpeechSynthesizer`] that turns text
//! into an audio reference. Either may be absent. Failures, timeouts,
//! and missing capabilities all degrade to fixed fallback values so the
//! event loop never stalls or crashes on a provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Reply used when the chat responder fails or times out.
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error processing your request.";

/// Reply used when no chat responder is configured.
pub const CHAT_PLACEHOLDER: &str =
    "This is a response from the WebSocket service. OpenAI integration is not available.";

/// Audio reference used when speech synthesis is unavailable or fails.
pub const FALLBACK_AUDIO_PATH: &str = "/static/tts/sample.mp3";

/// Default deadline for a single adapter call.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(30);

/// One turn of a conversation passed to a [`ChatResponder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message text.
    pub content: String,
    /// Unix timestamp (seconds) of the message.
    #[serde(default)]
    pub timestamp: i64,
    /// Display name of the sender.
    #[serde(default)]
    pub username: String,
    /// Whether the message was produced by the assistant.
    #[serde(default)]
    pub is_bot: bool,
}

/// Errors raised by adapter implementations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The provider could not be reached or rejected the request.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider answered with something the adapter cannot use.
    #[error("unexpected provider response: {0}")]
    Response(String),

    /// Local I/O failed (e.g. writing an audio file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The call did not finish before the deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces a text reply for a prompt.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Answer `prompt`, given the earlier turns of the conversation.
    async fn respond(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, AdapterError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Turns text into an audio reference.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return an opaque reference to the audio.
    async fn synthesize(&self, text: &str) -> Result<String, AdapterError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// The capabilities supplied at hub construction.
#[derive(Clone)]
pub struct Adapters {
    chat: Option<Arc<dyn ChatResponder>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    timeout: Duration,
}

impl Adapters {
    /// No capabilities: every request gets its fallback.
    pub const fn none() -> Self {
        Self {
            chat: None,
            speech: None,
            timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Attach a chat responder.
    #[must_use]
    pub fn with_chat(mut self, chat: Arc<dyn ChatResponder>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Attach a speech synthesizer.
    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Override the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured chat responder, if any.
    pub fn chat(&self) -> Option<&Arc<dyn ChatResponder>> {
        self.chat.as_ref()
    }

    /// The configured speech synthesizer, if any.
    pub fn speech(&self) -> Option<&Arc<dyn SpeechSynthesizer>> {
        self.speech.as_ref()
    }

    /// The per-call deadline.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call the chat responder under the deadline, surfacing errors.
    pub async fn try_chat(
        &self,
        chat: &dyn ChatResponder,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, AdapterError> {
        tokio::time::timeout(self.timeout, chat.respond(prompt, history))
            .await
            .map_err(|_elapsed| AdapterError::Timeout(self.timeout))?
    }

    /// Call the speech synthesizer under the deadline, surfacing errors.
    pub async fn try_speech(
        &self,
        speech: &dyn SpeechSynthesizer,
        text: &str,
    ) -> Result<String, AdapterError> {
        tokio::time::timeout(self.timeout, speech.synthesize(text))
            .await
            .map_err(|_elapsed| AdapterError::Timeout(self.timeout))?
    }

    /// Answer a hub-originated chat request.
    ///
    /// Hub requests carry no history. Never fails: a missing responder
    /// yields [`CHAT_PLACEHOLDER`], a failing one [`CHAT_APOLOGY`].
    pub async fn answer_chat(&self, prompt: &str) -> String {
        let Some(chat) = self.chat.as_deref() else {
            return CHAT_PLACEHOLDER.to_owned();
        };

        match self.try_chat(chat, prompt, &[]).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(responder = chat.name(), error = %e, "chat responder failed, sending apology");
                CHAT_APOLOGY.to_owned()
            }
        }
    }

    /// Answer a hub-originated speech request.
    ///
    /// Never fails: a missing or failing synthesizer yields
    /// [`FALLBACK_AUDIO_PATH`].
    pub async fn answer_speech(&self, text: &str) -> String {
        let Some(speech) = self.speech.as_deref() else {
            return FALLBACK_AUDIO_PATH.to_owned();
        };

        match self.try_speech(speech, text).await {
            Ok(path) => path,
            Err(e) => {
                warn!(synthesizer = speech.name(), error = %e, "speech synthesis failed, using fallback audio");
                FALLBACK_AUDIO_PATH.to_owned()
            }
        }
    }
}

impl Default for Adapters {
    fn default() -> Self {
        Self::none()
    }
}

impl core::fmt::Debug for Adapters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Adapters")
            .field("chat", &self.chat.as_ref().map(|c| c.name().to_owned()))
            .field("speech", &self.speech.as_ref().map(|s| s.name().to_owned()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
