//! Real-time relay hub for the Cozmo cloud service.
//!
//! The hub bridges two populations of duplex connections:
//!
//! - **Observers** -- browser clients that watch robot output and issue
//!   chat, speech, and robot-command requests.
//! - **Actors** -- robots, each identified by a caller-supplied string,
//!   producing and consuming raw frames.
//!
//! # Architecture
//!
//! ```text
//! receive loops --> Hub (front) --mpsc--> EventLoop --> ConnectionRegistry
//!                       |                    |
//!                       +-- read-lock queries +--> ChatResponder / SpeechSynthesizer
//! ```
//!
//! All observer-set mutations and all fan-out to observers happen inside
//! the single [`EventLoop`] task, which drains one totally ordered event
//! stream. Out-of-band queries (listing robots, sending to one robot)
//! take a shared lock on the [`ConnectionRegistry`] and observe a recent
//! consistent snapshot rather than a point in the event stream.

pub mod adapter;
pub mod connection;
pub mod error;
pub mod event;
pub mod hub;
pub mod protocol;
pub mod registry;

pub use adapter::{AdapterError, Adapters, ChatMessage, ChatResponder, SpeechSynthesizer};
pub use connection::{
    ConnectionClosed, ConnectionHandle, ConnectionId, Outbound, OutboundReceiver, OUTBOUND_CAPACITY,
};
pub use error::HubError;
pub use event::HubEvent;
pub use hub::{EventLoop, Hub, HubConfig};
pub use protocol::{FrameError, ObserverFrame, ObserverReply};
pub use registry::ConnectionRegistry;
