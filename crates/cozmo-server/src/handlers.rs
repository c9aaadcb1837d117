//! REST endpoint handlers for the relay server.
//!
//! Robot and broadcast endpoints forward request bodies verbatim through
//! the hub. Chat and speech endpoints call the adapters directly and,
//! unlike the socket path, report provider failures to the caller.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/robots` | Connected robot ids |
//! | `POST` | `/api/robots/{id}/send` | Raw body to one robot |
//! | `POST` | `/api/robots/broadcast` | Raw body to every robot |
//! | `POST` | `/api/broadcast` | Raw body to every browser |
//! | `POST` | `/api/chat` | Chat completion with history |
//! | `POST` | `/api/tts` | Speech synthesis |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use cozmo_hub::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Display name attached to chat replies.
const BOT_USERNAME: &str = "Cozmo";

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Query parameters for `POST /api/broadcast`.
#[derive(Debug, Deserialize)]
pub struct BroadcastQuery {
    /// Robot the payload is attributed to, for logging.
    pub robot_id: Option<String>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub conversation: Vec<ChatMessage>,
}

/// Reply of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    /// The bot's answer.
    pub message: ChatMessage,
}

/// Body of `POST /api/tts`.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    /// Text to speak.
    pub text: String,
}

/// Reply of `POST /api/tts`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsReply {
    /// Public URL path of the synthesized audio.
    pub audio_path: String,
}

// ---------------------------------------------------------------------------
// GET / and GET /health
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing connection counts and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let observers = state.hub.observer_count().await;
    let robots = state.hub.connected_actors().await;
    let started = state.started_at.format("%Y-%m-%d %H:%M:%S UTC");

    let mut robot_items = String::new();
    for id in &robots {
        let _ = write!(robot_items, "<li>{}</li>", escape_html(id));
    }
    if robots.is_empty() {
        robot_items.push_str("<li class=\"none\">none connected</li>");
    }
    let robot_count = robots.len();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Cozmo Relay</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        .none {{ color: #8b949e; }}
        code {{ color: #7ee787; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Cozmo Relay</h1>
    <p class="subtitle">Browser and robot message hub, up since {started}</p>

    <div>
        <div class="metric">
            <div class="label">Browsers</div>
            <div class="value">{observers}</div>
        </div>
        <div class="metric">
            <div class="label">Robots</div>
            <div class="value">{robot_count}</div>
        </div>
    </div>

    <h2>Robots</h2>
    <ul>{robot_items}</ul>

    <hr>

    <h2>Endpoints</h2>
    <ul>
        <li><code>GET /api/robots</code> -- connected robots</li>
        <li><code>POST /api/robots/:id/send</code> -- send a raw frame to one robot</li>
        <li><code>POST /api/robots/broadcast</code> -- send a raw frame to every robot</li>
        <li><code>POST /api/broadcast</code> -- send a raw frame to every browser</li>
        <li><code>POST /api/chat</code> -- chat with history</li>
        <li><code>POST /api/tts</code> -- text to speech</li>
        <li><code>ws://host:port/ws/browser</code> -- browser socket</li>
        <li><code>ws://host:port/ws/robot?id=ID</code> -- robot socket</li>
    </ul>
</body>
</html>"#
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime_secs = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": uptime_secs,
    }))
}

// ---------------------------------------------------------------------------
// Robots
// ---------------------------------------------------------------------------

/// List connected robot ids in ascending order.
pub async fn list_robots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let robots = state.hub.connected_actors().await;
    let count = robots.len();
    Json(serde_json::json!({
        "robots": robots,
        "count": count,
    }))
}

/// Forward the request body to one robot.
pub async fn send_to_robot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty payload".to_owned()));
    }
    let len = body.len();
    state.hub.send_to_actor(&id, body).await?;
    debug!(robot = %id, bytes = len, "Payload sent to robot");
    Ok(StatusCode::ACCEPTED)
}

/// Forward the request body to every robot.
pub async fn broadcast_to_robots(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty payload".to_owned()));
    }
    let delivered = state.hub.broadcast_to_actors(&body).await;
    info!(delivered, "Payload broadcast to robots");
    Ok(Json(serde_json::json!({ "delivered": delivered })))
}

// ---------------------------------------------------------------------------
// Browsers
// ---------------------------------------------------------------------------

/// Forward the request body to every browser.
///
/// Delivery happens on the hub's event loop, after this returns.
pub async fn broadcast_to_browsers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BroadcastQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty payload".to_owned()));
    }
    state
        .hub
        .broadcast_to_observers(query.robot_id.filter(|id| !id.is_empty()), body)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// Chat and speech
// ---------------------------------------------------------------------------

/// Answer a chat message, replaying the supplied conversation.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_owned()));
    }
    let Some(responder) = state.adapters.chat() else {
        return Err(ApiError::Unavailable("chat"));
    };

    let content = state
        .adapters
        .try_chat(responder.as_ref(), &request.message, &request.conversation)
        .await?;

    Ok(Json(ChatReply {
        message: ChatMessage {
            content,
            timestamp: Utc::now().timestamp(),
            username: BOT_USERNAME.to_owned(),
            is_bot: true,
        },
    }))
}

/// Synthesize speech and return where the audio is served.
pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    request: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<TtsReply>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_owned()));
    }
    let Some(synthesizer) = state.adapters.speech() else {
        return Err(ApiError::Unavailable("speech"));
    };

    let audio_path = state
        .adapters
        .try_speech(synthesizer.as_ref(), &request.text)
        .await?;

    Ok(Json(TtsReply { audio_path }))
}
