//! Events consumed by the hub's event loop.

use bytes::Bytes;

use crate::connection::ConnectionHandle;

/// One unit of work for the [`EventLoop`](crate::hub::EventLoop).
///
/// Events are immutable values; the only shared reference they carry is
/// a [`ConnectionHandle`].
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// Add a browser connection to the observer set.
    RegisterObserver(ConnectionHandle),
    /// Remove (and close) a browser connection.
    UnregisterObserver(ConnectionHandle),
    /// Send `payload` unmodified to every observer.
    BroadcastToObservers {
        /// Robot that produced the payload. Informational only; it is not
        /// embedded in what observers receive.
        actor_id: Option<String>,
        /// Raw bytes to deliver.
        payload: Bytes,
    },
    /// Ask the chat responder and reply to `origin`.
    ChatRequest {
        /// Prompt text.
        text: String,
        /// Connection that receives the `chat_response`.
        origin: ConnectionHandle,
    },
    /// Ask the speech synthesizer and reply to `origin`.
    SpeechRequest {
        /// Text to synthesize.
        text: String,
        /// Connection that receives the `tts_response`.
        origin: ConnectionHandle,
    },
}

impl HubEvent {
    /// Short label for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RegisterObserver(_) => "register_observer",
            Self::UnregisterObserver(_) => "unregister_observer",
            Self::BroadcastToObservers { .. } => "broadcast_to_observers",
            Self::ChatRequest { .. } => "chat_request",
            Self::SpeechRequest { .. } => "speech_request",
        }
    }
}
