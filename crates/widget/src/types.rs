//! Types for the chat widget

use chat_relay_client::StreamClientConfig;
use chat_relay_core::{ChatMessage, ConfigError, SessionId, StreamError};
use chat_relay_protocol::ErrorBody;

/// Reply shown when a turn completes without any text
pub const DEFAULT_FALLBACK: &str = "Got your message, but there is no reply yet 😊";

/// Body shape the widget posts to the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestVariant {
    /// `{"userMessage", "sessionId"}`; the upstream keeps the context
    #[default]
    Single,
    /// `{"messages": [...]}`; the whole transcript travels with every turn
    Conversation,
}

/// Options for [`ChatWidget`](crate::ChatWidget)
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    /// Full URL of the relay endpoint
    pub relay_url: String,
    /// Public key sent as bearer and `apikey`
    pub anon_key: String,
    pub variant: RequestVariant,
    /// Assistant message appended when a reply carries no text
    pub fallback_text: String,
    /// Leading system message for the [`RequestVariant::Conversation`] body
    pub system_prompt: Option<String>,
    /// Stream client settings (idle timeout, extra headers)
    pub client: StreamClientConfig,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8787/chat".to_string(),
            anon_key: String::new(),
            variant: RequestVariant::Single,
            fallback_text: DEFAULT_FALLBACK.to_string(),
            system_prompt: None,
            client: StreamClientConfig::default(),
        }
    }
}

impl WidgetOptions {
    pub fn new(relay_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }

    /// Read `RELAY_URL` (required) and `RELAY_ANON_KEY` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        let relay_url = std::env::var("RELAY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("RELAY_URL".to_string()))?;
        let anon_key = std::env::var("RELAY_ANON_KEY").unwrap_or_default();

        Ok(Self::new(relay_url.trim(), anon_key.trim()))
    }

    pub fn with_variant(mut self, variant: RequestVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_client_config(mut self, config: StreamClientConfig) -> Self {
        self.client = config;
        self
    }
}

/// Where the widget stands in the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetPhase {
    /// Ready for a new submit
    #[default]
    Idle,
    /// Request sent, no data yet
    AwaitingFirstByte,
    /// Data is arriving
    Streaming,
    /// The turn's final message is in the transcript; cleanup pending
    Finalizing,
}

impl WidgetPhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Copy of the widget state for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub transcript: Vec<ChatMessage>,
    /// Accumulated reply of the running turn
    pub in_progress: Option<String>,
    pub phase: WidgetPhase,
    pub session_id: Option<SessionId>,
}

/// Result of [`ChatWidget::submit`](crate::ChatWidget::submit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Reply (or fallback) appended
    Completed,
    /// Error message appended
    Failed(StreamError),
    /// Turn aborted, nothing appended
    Aborted,
    /// Another turn is in flight, nothing sent
    Busy,
    /// Blank input, nothing sent
    Empty,
}

/// Human-readable hint for a failed turn.
pub fn error_hint(error: &StreamError) -> &'static str {
    match error {
        StreamError::Http { status: 401 | 403, .. } => {
            "authentication with the chat service failed"
        }
        StreamError::Http { status: 404, .. } => "the chat service could not be found",
        StreamError::Http { status: 429, .. } => "too many requests, please wait a moment",
        StreamError::Http { status, .. } if *status >= 500 => {
            "the chat service hit a server error, please try again later"
        }
        StreamError::Http { .. } => "the chat service rejected the request",
        StreamError::Transport(_) => "network error, please check your connection",
        StreamError::IdleTimeout(_) => "the reply took too long to arrive",
        StreamError::InvalidRequest(_) => "the chat widget is misconfigured",
    }
}

/// Assistant message synthesized for a failed turn.
///
/// Only the relay's `details` field is shown next to the hint; raw bodies
/// and transport errors stay in the logs.
pub fn error_message(error: &StreamError) -> String {
    let details = match error {
        StreamError::Http { body, .. } => ErrorBody::parse(body)
            .and_then(|b| b.details)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        _ => None,
    };

    match details {
        Some(details) => format!("Sorry, {} ({})", error_hint(error), details),
        None => format!("Sorry, {}.", error_hint(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn http(status: u16) -> StreamError {
        StreamError::Http {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_hints_by_status() {
        assert!(error_hint(&http(401)).contains("authentication"));
        assert!(error_hint(&http(403)).contains("authentication"));
        assert!(error_hint(&http(404)).contains("not be found"));
        assert!(error_hint(&http(503)).contains("server error"));
        assert!(error_hint(&http(500)).contains("server error"));
        assert_eq!(error_hint(&http(400)), "the chat service rejected the request");
        assert!(error_hint(&StreamError::transport("refused")).contains("network"));
        assert!(error_hint(&StreamError::IdleTimeout(Duration::from_secs(1))).contains("too long"));
    }

    #[test]
    fn test_error_message_shows_relay_details_only() {
        let message = error_message(&StreamError::Http {
            status: 503,
            body: r#"{"error":"Upstream request failed: 503","details":"overloaded"}"#.to_string(),
        });
        assert_eq!(
            message,
            "Sorry, the chat service hit a server error, please try again later (overloaded)"
        );
    }

    #[test]
    fn test_error_message_hides_raw_text() {
        let raw = error_message(&StreamError::Http {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
        });
        assert_eq!(raw, "Sorry, the chat service hit a server error, please try again later.");

        let transport = error_message(&StreamError::transport("tcp connect error: refused"));
        assert_eq!(transport, "Sorry, network error, please check your connection.");
        assert!(!transport.contains("refused"));

        let no_details = error_message(&StreamError::Http {
            status: 400,
            body: r#"{"error":"userMessage is required"}"#.to_string(),
        });
        assert_eq!(no_details, "Sorry, the chat service rejected the request.");
    }

    #[test]
    fn test_options_defaults() {
        let options = WidgetOptions::default();
        assert_eq!(options.variant, RequestVariant::Single);
        assert_eq!(options.fallback_text, DEFAULT_FALLBACK);
        assert!(options.system_prompt.is_none());

        let options = WidgetOptions::new("http://relay/chat", "anon")
            .with_variant(RequestVariant::Conversation)
            .with_system_prompt("be brief");
        assert_eq!(options.relay_url, "http://relay/chat");
        assert_eq!(options.variant, RequestVariant::Conversation);
        assert_eq!(options.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_phase_busy() {
        assert!(!WidgetPhase::Idle.is_busy());
        assert!(WidgetPhase::AwaitingFirstByte.is_busy());
        assert!(WidgetPhase::Streaming.is_busy());
        assert!(WidgetPhase::Finalizing.is_busy());
    }
}
