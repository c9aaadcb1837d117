//! HTTP and `WebSocket` front end for the Cozmo relay hub.
//!
//! This crate wires the transport-agnostic [`cozmo_hub::Hub`] to the
//! network:
//!
//! - **`WebSocket` endpoints** (`/ws/browser`, `/ws/robot?id=`) that run
//!   one receive loop and one writer task per connection
//! - **REST endpoints** for listing robots, pushing payloads to robots or
//!   browsers, and one-shot chat and speech requests
//! - **Static files** under `/static`, which is where synthesized audio
//!   is served from
//!
//! Configuration comes from environment variables ([`RelayConfig`]);
//! [`start_server`] runs until the shutdown token fires.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use config::RelayConfig;
pub use error::{ApiError, ServerError};
pub use router::{build_app, build_router};
pub use server::{serve, shutdown_signal, start_server, ServerConfig};
pub use state::AppState;
