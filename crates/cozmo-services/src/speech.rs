//! Speech synthesis through the Google Translate TTS endpoint.
//!
//! Each request downloads one MP3, stores it under the configured
//! output directory with a fresh time-ordered name, and returns the
//! public URL path the static file server exposes it under.

use std::path::PathBuf;

use async_trait::async_trait;
use cozmo_hub::adapter::{AdapterError, SpeechSynthesizer};
use tracing::debug;
use uuid::Uuid;

use crate::config::SpeechConfig;

/// [`SpeechSynthesizer`] backed by the Google Translate TTS endpoint.
pub struct GoogleSpeech {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl GoogleSpeech {
    /// Create a synthesizer from configuration.
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Local path and public URL path for a new audio file.
    fn allocate(&self) -> (PathBuf, String) {
        let file_name = format!("tts_{}.mp3", Uuid::now_v7().simple());
        let local = self.config.output_dir.join(&file_name);
        let public = format!(
            "{}/{file_name}",
            self.config.public_prefix.trim_end_matches('/')
        );
        (local, public)
    }

    async fn fetch(&self, text: &str) -> Result<Vec<u8>, AdapterError> {
        let text_len = text.chars().count().to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", text_len.as_str()),
                ("client", "tw-ob"),
                ("q", text),
                ("tl", self.config.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::Request(format!("TTS request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Request(format!("TTS provider returned {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AdapterError::Response(format!("TTS body read failed: {e}")))?;
        if audio.is_empty() {
            return Err(AdapterError::Response("TTS provider returned no audio".to_owned()));
        }
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str) -> Result<String, AdapterError> {
        if text.trim().is_empty() {
            return Err(AdapterError::Request("nothing to synthesize".to_owned()));
        }

        let audio = self.fetch(text).await?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let (local, public) = self.allocate();
        tokio::fs::write(&local, &audio).await?;

        debug!(path = %local.display(), bytes = audio.len(), "Synthesized speech");
        Ok(public)
    }

    fn name(&self) -> &str {
        "google-translate-tts"
    }
}
