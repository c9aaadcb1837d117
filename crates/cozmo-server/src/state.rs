//! Shared application state for the relay server.

use chrono::{DateTime, Utc};
use cozmo_hub::{Adapters, Hub};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. The hub handles every socket; the adapters also answer the
/// one-shot REST chat and speech endpoints directly.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Front of the relay hub.
    pub hub: Hub,
    /// Chat and speech capabilities, shared with the hub's event loop.
    pub adapters: Adapters,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state around a running hub.
    pub fn new(hub: Hub, adapters: Adapters) -> Self {
        Self {
            hub,
            adapters,
            started_at: Utc::now(),
        }
    }
}
