//! Error types shared across the relay pipeline

use std::time::Duration;
use thiserror::Error;

/// Terminal failures of a single streamed turn, as seen by the caller of the
/// stream client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The relay (or upstream, relayed) answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection failed or the body stream broke mid-read
    #[error("Transport error: {0}")]
    Transport(String),

    /// No bytes arrived within the idle window
    #[error("Stream idle for longer than {0:?}")]
    IdleTimeout(Duration),

    /// A precondition of `open` was violated
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl StreamError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Configuration errors, raised while loading settings at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
