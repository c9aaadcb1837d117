//! Axum router construction for the relay.
//!
//! Assembles all routes (REST, `WebSocket` and static files) into a
//! single [`Router`] with CORS enabled for browser clients served from
//! other origins.

use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the API router without static file serving.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /health` -- liveness probe
/// - `GET /ws/browser` -- observer `WebSocket`
/// - `GET /ws/robot?id=` -- robot `WebSocket`
/// - `GET /api/robots` -- connected robot ids
/// - `POST /api/robots/{id}/send` -- raw payload to one robot
/// - `POST /api/robots/broadcast` -- raw payload to every robot
/// - `POST /api/broadcast` -- raw payload to every browser
/// - `POST /api/chat` -- one-shot chat completion
/// - `POST /api/tts` -- one-shot speech synthesis
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/browser", get(ws::ws_browser))
        .route("/ws/robot", get(ws::ws_robot))
        // REST API
        .route("/api/robots", get(handlers::list_robots))
        .route("/api/robots/broadcast", post(handlers::broadcast_to_robots))
        .route("/api/robots/{id}/send", post(handlers::send_to_robot))
        .route("/api/broadcast", post(handlers::broadcast_to_browsers))
        .route("/api/chat", post(handlers::chat))
        .route("/api/tts", post(handlers::text_to_speech))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the full application: the API router plus `/static` served
/// from `static_dir` and `/assets` served from `assets_dir`.
pub fn build_app(state: Arc<AppState>, static_dir: &Path, assets_dir: &Path) -> Router {
    build_router(state)
        .nest_service("/static", ServeDir::new(static_dir))
        .nest_service("/assets", ServeDir::new(assets_dir))
}
