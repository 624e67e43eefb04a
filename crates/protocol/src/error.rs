//! Error types for the relay wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Reasons a relay request body is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Body is not valid JSON, or not a JSON object
    #[error("Malformed request body: {0}")]
    Malformed(String),

    /// Required field absent or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Field present with the wrong JSON type
    #[error("Field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

impl ProtocolError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }

    pub fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }
}
