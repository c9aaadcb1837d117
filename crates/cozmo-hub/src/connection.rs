//! Duplex connection handles.
//!
//! A [`ConnectionHandle`] is the hub's only view of a socket. Writes are
//! queued on a bounded outbound channel that the transport layer drains
//! into the real sink; the hub never touches the socket itself. A write
//! that finds the queue full fails like a write to a dead socket, so a
//! peer that stops reading is evicted instead of growing memory.
//! Closing a handle fires a per-connection [`CancellationToken`] so the
//! receive loop owning the socket terminates and runs its teardown.

use std::hash::{Hash, Hasher};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::HubError;

/// Identity of one duplex connection.
///
/// Time-ordered (UUID v7) so log lines sort by connection age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a fresh connection identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame queued for the transport writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Raw payload bytes, written as a text frame when valid UTF-8.
    Payload(Bytes),
    /// Ask the writer to send a close frame and stop.
    Close,
}

/// Frames a connection may have queued before further writes fail.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Receiving end of a handle's outbound queue, owned by the transport writer.
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// A write was attempted on a connection that is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnectionClosed(pub ConnectionId);

/// Opaque, comparable reference to one duplex connection.
///
/// Clones share the same outbound queue and close token; equality and
/// hashing consider only the [`ConnectionId`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle together with the receiver its writes land on.
    ///
    /// The queue holds [`OUTBOUND_CAPACITY`] frames.
    pub fn channel() -> (Self, OutboundReceiver) {
        Self::with_capacity(OUTBOUND_CAPACITY)
    }

    /// Like [`channel`](Self::channel) with an explicit queue size.
    ///
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            tx,
            shutdown: CancellationToken::new(),
        };
        (handle, rx)
    }

    /// The identity of this connection.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a raw payload for the connection.
    ///
    /// Never waits. Fails once the handle has been closed, the transport
    /// writer has dropped its receiver, or the queue is full because the
    /// peer stopped reading.
    pub fn send(&self, payload: Bytes) -> Result<(), ConnectionClosed> {
        if self.shutdown.is_cancelled() {
            return Err(ConnectionClosed(self.id));
        }
        self.tx
            .try_send(Outbound::Payload(payload))
            .map_err(|e| match e {
                TrySendError::Full(_) | TrySendError::Closed(_) => ConnectionClosed(self.id),
            })
    }

    /// Serialize `value` as JSON and queue it for the connection.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), HubError> {
        let body = serde_json::to_vec(value)?;
        self.send(Bytes::from(body))?;
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        // Writer gone or queue full: the cancelled token still stops it.
        let _ = self.tx.try_send(Outbound::Close);
        self.shutdown.cancel();
    }

    /// Whether the handle was closed or its writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once [`close`](Self::close) has been called on any clone.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl Hash for ConnectionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
