//! Stored conversation messages.
//!
//! [`ChatMessage`] is the unit of session history: one user or assistant
//! utterance with an epoch-seconds timestamp. Sessions are JSON arrays of
//! these, held in the `session:` cache namespace.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One stored conversation message. Created on append, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Creation time, epoch seconds.
    pub timestamp: i64,
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl ChatMessage {
    /// Creates a user message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: now_epoch_secs(),
        }
    }

    /// Creates an assistant message stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_epoch_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Constructors produce the right role and a sane timestamp.
    #[test]
    fn constructors_set_role_and_timestamp() {
        let u = ChatMessage::user("hi");
        assert_eq!(u.role, Role::User);
        assert_eq!(u.content, "hi");
        assert!(u.timestamp > 0);

        let a = ChatMessage::assistant("hello");
        assert_eq!(a.role, Role::Assistant);
    }

    /// **Scenario**: Role serializes to lowercase strings and round-trips.
    #[test]
    fn role_serde_lowercase() {
        let msg = ChatMessage::user("q");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""), "{}", json);

        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "q");
    }

    /// **Scenario**: Display of Role matches the stored wire form.
    #[test]
    fn role_display_matches_wire_form() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
