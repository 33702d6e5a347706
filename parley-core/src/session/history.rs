//! Per-session message history

use super::message::{ChatMessage, Role};

/// Ordered message history of one conversation
///
/// The first entry is always the system prompt the history was seeded
/// with; every later entry sits after it in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHistory {
    messages: Vec<ChatMessage>,
}

impl MessageHistory {
    /// Create a history holding only the system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
        }
    }

    /// Append a message at the end
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    /// Full ordered sequence, as sent to the provider
    pub fn snapshot(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Overwrite the sequence with a merged one.
    ///
    /// The replacement must keep the seeded system message in first
    /// position and hold no other system message; otherwise the history is
    /// left untouched.
    pub fn replace(&mut self, messages: Vec<ChatMessage>) -> crate::Result<()> {
        match messages.first() {
            Some(first) if first == &self.messages[0] => {
                if let Some(index) = first_extra_system(&messages) {
                    return Err(crate::Error::Session(format!(
                        "replacement history has a second system message at index {}",
                        index
                    )));
                }
                self.messages = messages;
                Ok(())
            }
            Some(first) => Err(crate::Error::Session(format!(
                "replacement history must start with the seeded system message, found {} message",
                first.role
            ))),
            None => Err(crate::Error::Session(
                "replacement history is empty".to_string(),
            )),
        }
    }

    /// The seeded system prompt
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Most recent message
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a history holds at least its system prompt
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Index of the first system message after position 0
pub fn first_extra_system(messages: &[ChatMessage]) -> Option<usize> {
    messages
        .iter()
        .skip(1)
        .position(|message| message.role == Role::System)
        .map(|index| index + 1)
}
