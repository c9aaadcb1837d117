//! Relay entry point for the Cozmo cloud service.
//!
//! Bridges browser clients and robots over `WebSocket`s, answers chat
//! and speech requests through the configured providers, and serves the
//! static web assets.
//!
//! # Architecture
//!
//! ```text
//! /ws/browser --+                       +--> ChatResponder (LLM)
//!               +--> Hub --> EventLoop --+
//! /ws/robot  ---+                       +--> SpeechSynthesizer (TTS)
//! ```

use std::sync::Arc;

use cozmo_hub::{Adapters, Hub};
use cozmo_server::router::build_app;
use cozmo_server::{shutdown_signal, start_server, AppState, RelayConfig};
use cozmo_services::{create_backend, GoogleSpeech};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// builds the provider adapters, starts the hub, and serves HTTP until
/// `Ctrl-C` or `SIGTERM`.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("cozmo-relay starting");

    let config = RelayConfig::from_env()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        static_dir = %config.static_dir.display(),
        assets_dir = %config.assets_dir.display(),
        event_capacity = config.hub.event_capacity,
        adapter_timeout_ms = config.adapter_timeout.as_millis(),
        "configuration loaded"
    );

    let mut adapters = Adapters::none().with_timeout(config.adapter_timeout);
    match &config.llm {
        Some(llm) => {
            let backend = create_backend(llm);
            info!(backend = backend.label(), model = llm.model, "chat backend configured");
            adapters = adapters.with_chat(Arc::new(backend));
        }
        None => warn!("OPENAI_API_KEY not set, chat replies will be placeholders"),
    }
    match &config.speech {
        Some(speech) => {
            info!(
                language = speech.language,
                output_dir = %speech.output_dir.display(),
                "speech synthesis configured"
            );
            adapters = adapters.with_speech(Arc::new(GoogleSpeech::new(speech.clone())));
        }
        None => info!("speech synthesis disabled"),
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let (hub, event_loop) = Hub::spawn(config.hub, adapters.clone(), shutdown.clone());
    let state = Arc::new(AppState::new(hub, adapters));
    let app = build_app(state, &config.static_dir, &config.assets_dir);

    let served = start_server(&config.server, app, shutdown.clone()).await;

    // Bind or serve failures leave the hub running; stop it either way.
    shutdown.cancel();
    if let Err(e) = event_loop.await {
        warn!(error = %e, "hub event loop ended abnormally");
    }

    served?;
    info!("cozmo-relay stopped");
    Ok(())
}
