//! Error types for the relay server.
//!
//! [`ServerError`] covers startup and lifecycle failures. [`ApiError`]
//! is returned by REST handlers and converts into a JSON response via
//! its [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cozmo_hub::{AdapterError, HubError};

/// Errors that can occur when configuring, starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Errors surfaced by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or parameters are unusable.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No robot is registered under the given id.
    #[error("robot not found: {0}")]
    RobotNotFound(String),

    /// The requested capability is not configured on this server.
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    /// A provider adapter failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The hub refused the operation.
    #[error(transparent)]
    Hub(HubError),
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::ActorNotFound(id) => Self::RobotNotFound(id),
            other => Self::Hub(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RobotNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Adapter(_) | Self::Hub(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
