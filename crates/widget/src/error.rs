//! Error types for the chat widget

use chat_relay_core::{ConfigError, StreamError};
use thiserror::Error;

/// Errors raised while setting a widget up. Failed turns never surface here;
/// they become assistant messages in the transcript.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create stream client: {0}")]
    Client(#[from] StreamError),
}

/// Result type for widget setup
pub type Result<T> = std::result::Result<T, WidgetError>;
