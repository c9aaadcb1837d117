//! `WebSocket` endpoints for browsers and robots.
//!
//! Each upgraded socket is split. A writer task drains the connection's
//! outbound queue into the sink, so the hub only ever touches a
//! [`ConnectionHandle`]. The receive loop forwards every inbound frame
//! to the hub and stops when the peer goes away or the handle is closed
//! (replacement, failed write, shutdown). Teardown always runs.
//!
//! Pings are answered by the transport; pongs are ignored.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cozmo_hub::{ConnectionHandle, Hub, HubError, Outbound, OutboundReceiver};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::state::AppState;

/// Query parameters for `GET /ws/robot`.
#[derive(Debug, serde::Deserialize)]
pub struct RobotQuery {
    /// Identity the robot registers under.
    pub id: Option<String>,
}

/// Which population a socket belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Peer {
    Browser,
    Robot(String),
}

/// Upgrade a browser connection.
///
/// # Route
///
/// `GET /ws/browser`
pub async fn ws_browser(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| run_connection(socket, hub, Peer::Browser))
}

/// Upgrade a robot connection identified by `?id=`.
///
/// A missing or empty id is rejected before the upgrade.
///
/// # Route
///
/// `GET /ws/robot?id=<robot id>`
pub async fn ws_robot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RobotQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Robot ID is required").into_response();
    };

    match ws {
        Ok(ws) => {
            let hub = state.hub.clone();
            ws.on_upgrade(move |socket| run_connection(socket, hub, Peer::Robot(id)))
        }
        Err(rejection) => rejection.into_response(),
    }
}

async fn run_connection(socket: WebSocket, hub: Hub, peer: Peer) {
    let (handle, outbound) = ConnectionHandle::channel();

    let registered = match &peer {
        Peer::Browser => hub.register_observer(handle.clone()).await,
        Peer::Robot(id) => hub.register_actor(id, handle.clone()).await,
    };
    if let Err(e) = registered {
        warn!(connection = %handle.id(), error = %e, "Connection not registered");
        return;
    }
    match &peer {
        Peer::Browser => debug!(connection = %handle.id(), "Browser socket open"),
        Peer::Robot(id) => debug!(connection = %handle.id(), robot = %id, "Robot socket open"),
    }

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_outbound(sink, outbound, handle.clone()));

    read_inbound(stream, &hub, &peer, &handle).await;

    match &peer {
        Peer::Browser => {
            // Only fails once the hub is gone, which has closed us already.
            let _ = hub.unregister_observer(handle.clone()).await;
            debug!(connection = %handle.id(), "Browser socket closed");
        }
        Peer::Robot(id) => {
            let released = hub.release_actor(id, &handle).await;
            debug!(connection = %handle.id(), robot = %id, released, "Robot socket closed");
        }
    }

    handle.close();
    if let Err(e) = writer.await {
        debug!(connection = %handle.id(), error = %e, "Writer task ended abnormally");
    }
}

async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    hub: &Hub,
    peer: &Peer,
    handle: &ConnectionHandle,
) {
    loop {
        let frame = tokio::select! {
            () = handle.closed() => {
                debug!(connection = %handle.id(), "Connection closed by hub");
                return;
            }
            frame = stream.next() => frame,
        };

        let payload = match frame {
            Some(Ok(Message::Text(text))) => Bytes::copy_from_slice(text.as_str().as_bytes()),
            Some(Ok(Message::Binary(data))) => data,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return,
            Some(Err(e)) => {
                debug!(connection = %handle.id(), error = %e, "WebSocket read error");
                return;
            }
        };

        if let Err(e) = dispatch(hub, peer, handle, payload).await {
            debug!(connection = %handle.id(), error = %e, "Hub stopped, ending receive loop");
            return;
        }
    }
}

async fn dispatch(
    hub: &Hub,
    peer: &Peer,
    handle: &ConnectionHandle,
    payload: Bytes,
) -> Result<(), HubError> {
    match peer {
        Peer::Browser => hub.dispatch_observer_frame(payload, handle).await,
        Peer::Robot(id) => hub.dispatch_actor_frame(id, payload).await,
    }
}

/// Drain the outbound queue into the sink.
///
/// Once the handle is closed a write that cannot complete at once is
/// abandoned, so a stalled peer never holds the task. The cancelled
/// token also stands in for a close request that did not fit in a full
/// queue.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: OutboundReceiver,
    handle: ConnectionHandle,
) {
    loop {
        let frame = tokio::select! {
            biased;
            frame = outbound.recv() => frame,
            () = handle.closed() => Some(Outbound::Close),
        };

        let message = match frame {
            Some(Outbound::Payload(bytes)) => to_message(bytes),
            Some(Outbound::Close) => Message::Close(None),
            None => return,
        };
        let is_close = matches!(message, Message::Close(_));

        let sent = tokio::select! {
            biased;
            sent = sink.send(message) => sent.is_ok(),
            () = handle.closed(), if !is_close => false,
            () = tokio::time::sleep(CLOSE_GRACE), if is_close => false,
        };
        if is_close || !sent {
            // Dropping the receiver makes later hub writes fail.
            return;
        }
    }
}

/// How long a close frame may wait on a slow peer.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Text frame when the payload is valid UTF-8, binary otherwise.
///
/// Both arms reuse the payload's buffer.
fn to_message(bytes: Bytes) -> Message {
    match Utf8Bytes::try_from(bytes.clone()) {
        Ok(text) => Message::Text(text),
        Err(_not_utf8) => Message::Binary(bytes),
    }
}
