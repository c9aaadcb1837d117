//! Error types for the relay hub.
//!
//! Nothing here is fatal to the hub. Transport failures evict the
//! offending connection, adapter failures degrade to fallback content,
//! and the variants below are only surfaced to callers of the query
//! surface and the enqueue entry points.

use crate::connection::ConnectionClosed;

/// Errors returned by the hub's entry points.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// No robot is connected under the requested identity.
    #[error("actor not found: {0}")]
    ActorNotFound(String),

    /// Robots must register with a non-empty identity.
    #[error("actor id must not be empty")]
    EmptyActorId,

    /// The target connection is already closed.
    #[error(transparent)]
    Closed(#[from] ConnectionClosed),

    /// The event loop is no longer accepting events.
    #[error("hub event loop has stopped")]
    Stopped,

    /// A reply could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
