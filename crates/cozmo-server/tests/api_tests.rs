//! Integration tests for the relay REST endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt`
//! against a live hub whose sockets are channel-backed handles.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use cozmo_hub::adapter::AdapterError;
use cozmo_hub::{
    Adapters, ChatMessage, ChatResponder, ConnectionHandle, Hub, HubConfig, Outbound,
    OutboundReceiver, SpeechSynthesizer,
};
use cozmo_server::router::{build_app, build_router};
use cozmo_server::state::AppState;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Echoes the prompt and the number of history turns it was given.
struct EchoChat;

#[async_trait]
impl ChatResponder for EchoChat {
    async fn respond(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, AdapterError> {
        Ok(format!("{prompt} ({} earlier)", history.len()))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct BrokenChat;

#[async_trait]
impl ChatResponder for BrokenChat {
    async fn respond(&self, _prompt: &str, _history: &[ChatMessage]) -> Result<String, AdapterError> {
        Err(AdapterError::Response("no choices".to_owned()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

struct FixedSpeech;

#[async_trait]
impl SpeechSynthesizer for FixedSpeech {
    async fn synthesize(&self, _text: &str) -> Result<String, AdapterError> {
        Ok("/static/tts/tts_test.mp3".to_owned())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct TestApp {
    router: Router,
    hub: Hub,
    shutdown: CancellationToken,
}

impl TestApp {
    fn new(adapters: Adapters) -> Self {
        let shutdown = CancellationToken::new();
        let (hub, _task) = Hub::spawn(HubConfig::default(), adapters.clone(), shutdown.clone());
        let state = Arc::new(AppState::new(hub.clone(), adapters));
        Self {
            router: build_router(state),
            hub,
            shutdown,
        }
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn robot(&self, id: &str) -> OutboundReceiver {
        let (handle, rx) = ConnectionHandle::channel();
        self.hub.register_actor(id, handle).await.unwrap();
        rx
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn next_payload(rx: &mut OutboundReceiver) -> Bytes {
    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(Outbound::Payload(bytes))) => bytes,
        other => panic!("expected a payload, got {other:?}"),
    }
}

// =========================================================================
// Status pages
// =========================================================================

#[tokio::test]
async fn index_lists_connected_robots() {
    let app = TestApp::new(Adapters::none());
    let _rx = app.robot("cozmo-<1>").await;

    let (status, body) = app.call(Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Cozmo Relay"));
    assert!(html.contains("cozmo-&lt;1&gt;"));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new(Adapters::none());
    let (status, body) = app
        .call(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

// =========================================================================
// Static files
// =========================================================================

#[tokio::test]
async fn static_and_asset_directories_are_served() {
    let root = std::env::temp_dir().join(format!("cozmo-relay-files-{}", std::process::id()));
    let static_dir = root.join("static");
    let assets_dir = root.join("assets");
    std::fs::create_dir_all(static_dir.join("tts")).unwrap();
    std::fs::create_dir_all(&assets_dir).unwrap();
    std::fs::write(static_dir.join("tts/hello.mp3"), b"ID3").unwrap();
    std::fs::write(assets_dir.join("app.js"), b"console.log(1)").unwrap();

    let app = TestApp::new(Adapters::none());
    let state = Arc::new(AppState::new(app.hub.clone(), Adapters::none()));
    let router = build_app(state, &static_dir, &assets_dir);

    for (uri, expected) in [
        ("/static/tts/hello.mp3", &b"ID3"[..]),
        ("/assets/app.js", &b"console.log(1)"[..]),
    ] {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], expected);
    }

    let missing = router
        .oneshot(Request::get("/assets/missing.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    std::fs::remove_dir_all(&root).unwrap();
}

// =========================================================================
// Robot socket precondition
// =========================================================================

#[tokio::test]
async fn robot_socket_without_id_is_rejected() {
    let app = TestApp::new(Adapters::none());

    for uri in ["/ws/robot", "/ws/robot?id="] {
        let (status, body) = app.call(Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(&body[..], b"Robot ID is required");
    }
}

// =========================================================================
// Robots
// =========================================================================

#[tokio::test]
async fn list_robots_is_sorted() {
    let app = TestApp::new(Adapters::none());
    let _r2 = app.robot("r2").await;
    let _r1 = app.robot("r1").await;

    let (status, body) = app
        .call(Request::get("/api/robots").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        serde_json::json!({"robots": ["r1", "r2"], "count": 2})
    );
}

#[tokio::test]
async fn send_to_robot_forwards_body_verbatim() {
    let app = TestApp::new(Adapters::none());
    let mut rx = app.robot("r1").await;

    let (status, _) = app
        .call(
            Request::post("/api/robots/r1/send")
                .body(Body::from("drive:forward"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(&next_payload(&mut rx).await[..], b"drive:forward");
}

#[tokio::test]
async fn send_to_unknown_robot_is_not_found() {
    let app = TestApp::new(Adapters::none());

    let (status, body) = app
        .call(
            Request::post("/api/robots/ghost/send")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json(&body);
    assert_eq!(body["status"], 404);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn broadcast_to_robots_counts_deliveries() {
    let app = TestApp::new(Adapters::none());
    let mut r1 = app.robot("r1").await;
    let mut r2 = app.robot("r2").await;

    let (status, body) = app
        .call(
            Request::post("/api/robots/broadcast")
                .body(Body::from("lift"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["delivered"], 2);
    assert_eq!(&next_payload(&mut r1).await[..], b"lift");
    assert_eq!(&next_payload(&mut r2).await[..], b"lift");
}

#[tokio::test]
async fn empty_payloads_are_rejected() {
    let app = TestApp::new(Adapters::none());
    let _rx = app.robot("r1").await;

    let (status, _) = app
        .call(Request::post("/api/robots/r1/send").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// Browsers
// =========================================================================

#[tokio::test]
async fn broadcast_reaches_registered_browsers() {
    let app = TestApp::new(Adapters::none());
    let (browser, mut rx) = ConnectionHandle::channel();
    app.hub.register_observer(browser).await.unwrap();

    let (status, _) = app
        .call(
            Request::post("/api/broadcast?robot_id=r7")
                .body(Body::from("battery:80"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(&next_payload(&mut rx).await[..], b"battery:80");
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn chat_replays_conversation() {
    let app = TestApp::new(Adapters::none().with_chat(Arc::new(EchoChat)));
    let request = serde_json::json!({
        "message": "wave",
        "conversation": [
            {"content": "hi", "timestamp": 1, "username": "ana", "isBot": false},
            {"content": "hello", "timestamp": 2, "username": "Cozmo", "isBot": true},
        ],
    });

    let (status, body) = app.call(post_json("/api/chat", &request)).await;

    assert_eq!(status, StatusCode::OK);
    let message = &json(&body)["message"];
    assert_eq!(message["content"], "wave (2 earlier)");
    assert_eq!(message["username"], "Cozmo");
    assert_eq!(message["isBot"], true);
    assert!(message["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn chat_without_responder_is_unavailable() {
    let app = TestApp::new(Adapters::none());
    let (status, body) = app
        .call(post_json("/api/chat", &serde_json::json!({"message": "hi"})))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["status"], 503);
}

#[tokio::test]
async fn chat_provider_failure_is_internal_error() {
    let app = TestApp::new(Adapters::none().with_chat(Arc::new(BrokenChat)));
    let (status, body) = app
        .call(post_json("/api/chat", &serde_json::json!({"message": "hi"})))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"].as_str().unwrap().contains("no choices"));
}

#[tokio::test]
async fn chat_rejects_bad_bodies() {
    let app = TestApp::new(Adapters::none().with_chat(Arc::new(EchoChat)));

    let (status, _) = app
        .call(post_json("/api/chat", &serde_json::json!({"message": ""})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Request::post("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["status"], 400);
}

// =========================================================================
// Speech
// =========================================================================

#[tokio::test]
async fn tts_returns_audio_path() {
    let app = TestApp::new(Adapters::none().with_speech(Arc::new(FixedSpeech)));
    let (status, body) = app
        .call(post_json("/api/tts", &serde_json::json!({"text": "halo"})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        serde_json::json!({"audioPath": "/static/tts/tts_test.mp3"})
    );
}

#[tokio::test]
async fn tts_without_synthesizer_is_unavailable() {
    let app = TestApp::new(Adapters::none());
    let (status, _) = app
        .call(post_json("/api/tts", &serde_json::json!({"text": "halo"})))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
