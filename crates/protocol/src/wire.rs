//! Wire types between the widget, the relay and the upstream provider.

use chat_relay_core::{ChatMessage, Role, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};

/// Response header the relay uses to echo the session id it forwarded.
pub const SESSION_HEADER: &str = "x-session-id";

/// Body the widget posts to the relay.
///
/// Serializes to `{"userMessage": …, "sessionId": …}` or
/// `{"messages": [{"role": …, "content": …}, …]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayRequest {
    /// One user message plus the session id of the conversation (`""` when
    /// none is known yet)
    Single {
        #[serde(rename = "userMessage")]
        user_message: String,
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Full transcript; prior turns travel with every request
    Conversation { messages: Vec<ChatMessage> },
}

impl RelayRequest {
    pub fn single(user_message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::Single {
            user_message: user_message.into(),
            session_id: session_id.into(),
        }
    }

    pub fn conversation(messages: Vec<ChatMessage>) -> Self {
        Self::Conversation { messages }
    }

    /// Parse and validate a request body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let Value::Object(object) = value else {
            return Err(ProtocolError::Malformed(
                "expected a JSON object".to_string(),
            ));
        };

        if object.contains_key("messages") {
            Self::parse_conversation(&object)
        } else {
            Self::parse_single(&object)
        }
    }

    fn parse_single(object: &Map<String, Value>) -> Result<Self> {
        let user_message = match object.get("userMessage") {
            None | Some(Value::Null) => return Err(ProtocolError::missing("userMessage")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ProtocolError::missing("userMessage"))
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ProtocolError::invalid("userMessage", "a string")),
        };

        let session_id = match object.get("sessionId") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ProtocolError::invalid("sessionId", "a string")),
        };

        Ok(Self::Single {
            user_message,
            session_id,
        })
    }

    fn parse_conversation(object: &Map<String, Value>) -> Result<Self> {
        let messages: Vec<ChatMessage> = match object.get("messages") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value(item.clone()).map_err(|_| {
                        ProtocolError::invalid(
                            format!("messages[{}]", i),
                            "an object with a known `role` and a string `content`",
                        )
                    })
                })
                .collect::<Result<_>>()?,
            _ => return Err(ProtocolError::invalid("messages", "an array")),
        };

        match messages.last() {
            None => Err(ProtocolError::missing("messages")),
            Some(last) if last.role != Role::User => Err(ProtocolError::invalid(
                "messages",
                "an array ending with a user message",
            )),
            Some(last) if last.content.trim().is_empty() => {
                Err(ProtocolError::missing("messages[-1].content"))
            }
            Some(_) => Ok(Self::Conversation { messages }),
        }
    }

    /// Session id supplied by the caller, if non-blank.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::Single { session_id, .. } if !session_id.trim().is_empty() => {
                Some(SessionId::new(session_id.trim()))
            }
            _ => None,
        }
    }

    /// Text forwarded to the upstream as the query.
    ///
    /// For a conversation, earlier turns are prepended one per line as
    /// `role: content`, followed by the final user message.
    pub fn prompt_text(&self) -> String {
        match self {
            Self::Single { user_message, .. } => user_message.clone(),
            Self::Conversation { messages } => {
                let Some((last, history)) = messages.split_last() else {
                    return String::new();
                };
                let mut text: String = history
                    .iter()
                    .map(|m| format!("{}: {}\n", m.role, m.content))
                    .collect();
                text.push_str(&last.content);
                text
            }
        }
    }
}

/// Request envelope expected by the upstream `stream_run` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamEnvelope {
    pub content: UpstreamContent,
    #[serde(rename = "type")]
    pub kind: String,
    pub session_id: String,
    pub project_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamContent {
    pub query: UpstreamQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamQuery {
    pub prompt: Vec<PromptPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: PromptText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptText {
    pub text: String,
}

impl UpstreamEnvelope {
    pub fn new(text: impl Into<String>, session_id: &SessionId, project_id: u64) -> Self {
        Self {
            content: UpstreamContent {
                query: UpstreamQuery {
                    prompt: vec![PromptPart {
                        kind: "text".to_string(),
                        content: PromptText { text: text.into() },
                    }],
                },
            },
            kind: "query".to_string(),
            session_id: session_id.to_string(),
            project_id,
        }
    }
}

/// JSON error body returned by the relay with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Read an error envelope back out of a response body.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}
