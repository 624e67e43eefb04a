//! Error types for the relay server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat_relay_protocol::{ErrorBody, ProtocolError};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::TOKEN_VARS;

/// Errors that end a relay request with a JSON error envelope
#[derive(Error, Debug)]
pub enum RelayError {
    /// The request body failed validation
    #[error("{0}")]
    InvalidRequest(#[from] ProtocolError),

    /// No upstream secret is configured
    #[error("Upstream credential is not configured")]
    MissingCredential,

    /// The upstream answered with a non-2xx status
    #[error("Upstream request failed: {status}")]
    Upstream { status: StatusCode, body: String },

    /// The upstream could not be reached
    #[error("Failed to reach upstream: {0}")]
    Transport(String),

    /// Anything else
    #[error("Internal server error")]
    Internal(String),
}

impl RelayError {
    /// HTTP status the error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::MissingCredential | Self::Transport(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON envelope sent to the caller
    pub fn body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.to_string());
        match self {
            Self::InvalidRequest(_) => body,
            Self::MissingCredential => {
                body.with_details(format!("set one of {}", TOKEN_VARS.join(", ")))
            }
            Self::Upstream { body: details, .. } => body.with_details(details.clone()),
            Self::Transport(details) | Self::Internal(details) => body.with_details(details.clone()),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "relay request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "relay request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
