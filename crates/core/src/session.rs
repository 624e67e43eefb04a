//! Conversation session identifiers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id the upstream uses to keep its own conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id (32 lowercase hex characters).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix, safe for log lines.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holds the session id of one open conversation.
///
/// Assignment rule: the first non-blank id offered while the slot is empty
/// wins, and later offers are ignored until [`SessionSlot::clear`]. Offers
/// come from the relay's echoed session header and from response frames, in
/// arrival order.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    current: Option<SessionId>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an id. Returns `true` if it was adopted.
    pub fn offer(&mut self, id: &str) -> bool {
        let id = id.trim();
        if self.current.is_some() || id.is_empty() {
            return false;
        }
        self.current = Some(SessionId::new(id));
        true
    }

    pub fn get(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    /// Id to send on the next turn; empty when none is known yet.
    pub fn as_wire(&self) -> String {
        self.current
            .as_ref()
            .map(|id| id.0.clone())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_first_offer_wins() {
        let mut slot = SessionSlot::new();
        assert_eq!(slot.as_wire(), "");

        assert!(slot.offer("conv-1"));
        assert!(!slot.offer("conv-2"));
        assert_eq!(slot.get(), Some(&SessionId::new("conv-1")));
        assert_eq!(slot.as_wire(), "conv-1");
    }

    #[test]
    fn test_blank_offer_ignored() {
        let mut slot = SessionSlot::new();
        assert!(!slot.offer("   "));
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_clear_allows_new_id() {
        let mut slot = SessionSlot::new();
        slot.offer("a");
        slot.clear();
        assert!(slot.offer("b"));
        assert_eq!(slot.as_wire(), "b");
    }

    #[test]
    fn test_redacted_hides_tail() {
        let id = SessionId::new("abcdef123456");
        assert_eq!(id.redacted(), "abcdef…");
    }
}
