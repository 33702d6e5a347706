//! Chat message data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
///
/// Messages are immutable once built; serialized form is exactly
/// `{"role": ..., "content": ...}`, which is what providers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (system, user, assistant)
    pub role: Role,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Try to read a message out of an untyped JSON value.
    ///
    /// Returns `None` for anything that is not an object with a known
    /// `role` and a string `content`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let msg = ChatMessage::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_from_value_accepts_extra_fields() {
        let value = json!({"role": "assistant", "content": "Hi", "name": "bot"});
        let msg = ChatMessage::from_value(&value).unwrap();
        assert_eq!(msg, ChatMessage::assistant("Hi"));
    }

    #[test]
    fn test_from_value_rejects_malformed() {
        assert!(ChatMessage::from_value(&json!({"role": "tool", "content": "x"})).is_none());
        assert!(ChatMessage::from_value(&json!({"role": "user", "content": null})).is_none());
        assert!(ChatMessage::from_value(&json!({"content": "orphan"})).is_none());
        assert!(ChatMessage::from_value(&json!("just a string")).is_none());
    }
}
