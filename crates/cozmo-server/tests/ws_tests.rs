//! End-to-end `WebSocket` tests against a server on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cozmo_hub::{Adapters, Hub, HubConfig};
use cozmo_server::router::build_router;
use cozmo_server::serve;
use cozmo_server::state::AppState;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Relay {
    addr: SocketAddr,
    hub: Hub,
    shutdown: CancellationToken,
}

impl Relay {
    async fn start() -> Self {
        let shutdown = CancellationToken::new();
        let adapters = Adapters::none();
        let (hub, _task) = Hub::spawn(HubConfig::default(), adapters.clone(), shutdown.clone());
        let state = Arc::new(AppState::new(hub.clone(), adapters));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, build_router(state), shutdown.clone()));

        Self {
            addr,
            hub,
            shutdown,
        }
    }

    /// Connect a browser and wait until the hub has registered it.
    ///
    /// The chat reply is produced by the event loop after the queued
    /// registration, so receiving it proves the browser is in the set.
    async fn browser(&self) -> Socket {
        let url = format!("ws://{}/ws/browser", self.addr);
        let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        socket
            .send(Message::text(r#"{"type":"chat","data":"ping"}"#))
            .await
            .unwrap();
        let reply = next_text(&mut socket).await;
        assert!(reply.contains("chat_response"), "{reply}");
        socket
    }

    /// Connect a robot and wait until it is listed.
    async fn robot(&self, id: &str) -> Socket {
        let url = format!("ws://{}/ws/robot?id={id}", self.addr);
        let (socket, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.hub.connected_actors().await.iter().any(|a| a == id) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        socket
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn next_text(socket: &mut Socket) -> String {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), socket.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return text.as_str().to_owned(),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn robot_frames_reach_browsers_verbatim() {
    let relay = Relay::start().await;
    let mut browser = relay.browser().await;
    let mut robot = relay.robot("r1").await;

    robot.send(Message::text("sensor:42")).await.unwrap();

    assert_eq!(next_text(&mut browser).await, "sensor:42");
}

#[tokio::test]
async fn robot_commands_reach_every_robot() {
    let relay = Relay::start().await;
    let mut browser = relay.browser().await;
    let mut r1 = relay.robot("r1").await;
    let mut r2 = relay.robot("r2").await;

    let command = r#"{"type":"robot_command","data":{"action":"lift"}}"#;
    browser.send(Message::text(command)).await.unwrap();

    assert_eq!(next_text(&mut r1).await, command);
    assert_eq!(next_text(&mut r2).await, command);
}

#[tokio::test]
async fn chat_without_provider_gets_placeholder() {
    let relay = Relay::start().await;
    let mut browser = relay.browser().await;

    browser
        .send(Message::text(r#"{"type":"chat","data":"hello"}"#))
        .await
        .unwrap();
    let reply: serde_json::Value = serde_json::from_str(&next_text(&mut browser).await).unwrap();

    assert_eq!(reply["type"], "chat_response");
    assert_eq!(
        reply["data"],
        "This is a response from the WebSocket service. OpenAI integration is not available."
    );
}

#[tokio::test]
async fn robot_without_id_is_refused() {
    let relay = Relay::start().await;
    let url = format!("ws://{}/ws/robot", relay.addr);

    assert!(tokio_tungstenite::connect_async(&url).await.is_err());
}

#[tokio::test]
async fn reconnecting_robot_replaces_the_old_socket() {
    let relay = Relay::start().await;
    let mut first = relay.robot("r1").await;
    let (mut second, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/robot?id=r1", relay.addr))
        .await
        .unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "replaced socket was not closed");

    relay
        .hub
        .send_to_actor("r1", bytes::Bytes::from_static(b"still here"))
        .await
        .unwrap();
    assert_eq!(next_text(&mut second).await, "still here");
    assert_eq!(relay.hub.connected_actors().await, vec!["r1".to_owned()]);
}

#[tokio::test]
async fn browser_disconnect_unregisters_it() {
    let relay = Relay::start().await;
    let mut browser = relay.browser().await;
    assert_eq!(relay.hub.observer_count().await, 1);

    browser.close(None).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.hub.observer_count().await != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
