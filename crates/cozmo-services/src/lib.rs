//! Provider adapters for the Cozmo relay hub.
//!
//! - [`llm`] -- chat responders over HTTP (`OpenAI`-compatible chat
//!   completions and the Anthropic Messages API), enum-dispatched.
//! - [`speech`] -- a speech synthesizer that fetches MP3 audio from the
//!   Google Translate TTS endpoint and stores it in a served directory.
//!
//! Both implement the capability traits from [`cozmo_hub::adapter`], so
//! the hub treats them as opaque, fallible collaborators.

pub mod config;
pub mod llm;
pub mod speech;

pub use config::{BackendType, ConfigError, LlmBackendConfig, SpeechConfig};
pub use llm::{create_backend, LlmBackend};
pub use speech::GoogleSpeech;
