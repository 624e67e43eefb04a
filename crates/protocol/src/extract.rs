//! Text delta extraction from upstream data segments
//!
//! Upstream providers do not agree on a streaming schema. The relay has seen
//! at least these shapes in the wild:
//!
//! ```text
//! {"type":"answer","content":{"answer":"Hi"}}          workflow engine
//! {"type":"answer","content":"Hi"}                     workflow engine, flat
//! {"event":"conversation.message.delta","data":{"content":"Hi"}}
//! {"choices":[{"delta":{"content":"Hi"}}]}             chat-completions
//! {"content":"Hi"} / {"text":"Hi"} / {"delta":"Hi"}    flat fields
//! Hi                                                   plain text, not JSON
//! ```
//!
//! [`ContentExtractor`] tries an ordered list of [`ExtractionRule`]s and the
//! first non-empty result wins. Support for a new provider is added by
//! appending a rule with [`ContentExtractor::with_rule`]; the standard rules
//! keep their position so existing integrations behave the same.

use serde_json::Value;
use tracing::trace;

/// Marker some providers send as the last data segment.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A pure `json → optional text` matcher for one provider shape.
#[derive(Clone, Copy)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub apply: fn(&Value) -> Option<String>,
}

impl ExtractionRule {
    pub const fn new(name: &'static str, apply: fn(&Value) -> Option<String>) -> Self {
        Self { name, apply }
    }
}

impl std::fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExtractionRule").field(&self.name).finish()
    }
}

/// Result of inspecting one data segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Text delta to append; empty for control frames
    pub text: String,
    /// Conversation id carried by the segment, if any
    pub session_id: Option<String>,
    /// Name of the rule that produced `text`
    pub matched: Option<&'static str>,
}

/// Ordered strategy list turning data segments into text deltas.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    rules: Vec<ExtractionRule>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

impl ContentExtractor {
    /// Extractor with the built-in rules, in priority order.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                ExtractionRule::new("workflow_answer", workflow_answer),
                ExtractionRule::new("chat_event_delta", chat_event_delta),
                ExtractionRule::new("completion_delta", completion_delta),
                ExtractionRule::new("flat_field", flat_field),
                ExtractionRule::new("json_string", json_string),
            ],
        }
    }

    /// Extractor with no rules: every JSON segment extracts to nothing.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name)
    }

    /// Text delta carried by `segment` (possibly empty).
    pub fn extract(&self, segment: &str) -> String {
        self.inspect(segment).text
    }

    /// Text delta plus any session id carried by `segment`.
    pub fn inspect(&self, segment: &str) -> Extraction {
        if segment.trim() == DONE_SENTINEL {
            return Extraction::default();
        }

        let value: Value = match serde_json::from_str(segment) {
            Ok(value) => value,
            Err(_) => {
                return Extraction {
                    text: segment.to_string(),
                    ..Default::default()
                }
            }
        };

        let session_id = session_id_of(&value);

        for rule in &self.rules {
            if let Some(text) = (rule.apply)(&value).filter(|t| !t.is_empty()) {
                trace!(rule = rule.name, len = text.len(), "extracted delta");
                return Extraction {
                    text,
                    session_id,
                    matched: Some(rule.name),
                };
            }
        }

        Extraction {
            text: String::new(),
            session_id,
            matched: None,
        }
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Conversation id carried by a segment: `conversation_id`, then `session_id`.
pub fn session_id_of(value: &Value) -> Option<String> {
    str_field(value, "conversation_id")
        .or_else(|| str_field(value, "session_id"))
        .filter(|id| !id.trim().is_empty())
}

/// `{"type":"answer","content":"…"}` or `{"type":"answer","content":{"answer":"…"}}`
pub fn workflow_answer(value: &Value) -> Option<String> {
    if value.get("type").and_then(Value::as_str) != Some("answer") {
        return None;
    }

    match value.get("content")? {
        Value::String(s) => Some(s.clone()),
        content @ Value::Object(_) => str_field(content, "answer"),
        _ => None,
    }
}

/// `{"event":"conversation.message.delta","data":{"content":"…"}}`
pub fn chat_event_delta(value: &Value) -> Option<String> {
    if value.get("event").and_then(Value::as_str) != Some("conversation.message.delta") {
        return None;
    }
    str_field(value.get("data")?, "content")
}

/// `{"choices":[{"delta":{"content":"…"}}]}`
pub fn completion_delta(value: &Value) -> Option<String> {
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// First string among `data`, `content`, `text`, `message`, `delta`.
pub fn flat_field(value: &Value) -> Option<String> {
    ["data", "content", "text", "message", "delta"]
        .iter()
        .find_map(|key| str_field(value, key).filter(|s| !s.is_empty()))
}

/// A segment that is itself a JSON string literal.
pub fn json_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}
