//! Chat session and message domain types.
//!
//! A `ChatSession` is one visitor's conversation thread with a profile's
//! assistant. It owns an append-only, ordered sequence of `ChatMessage`s;
//! messages are never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a persisted chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The visitor
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One chat thread, owned by a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Store-assigned id (0 until inserted).
    pub id: i64,

    /// The profile whose assistant this session talks to.
    pub profile_id: i64,

    pub created_at: DateTime<Utc>,
}

/// A single persisted message in a session. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned id (0 until inserted).
    pub id: i64,

    pub session_id: i64,

    pub role: Role,

    pub content: String,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
    }

    #[test]
    fn role_parse_roundtrip() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = ChatMessage {
            id: 7,
            session_id: 3,
            role: Role::Assistant,
            content: "您好!".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.role, Role::Assistant);
        assert_eq!(back.content, "您好!");
    }
}
