//! Conversation data model
//!
//! A session's history is an ordered, append-only list of role/content
//! messages that always opens with the configured system prompt.

pub mod history;
pub mod message;

pub use history::{first_extra_system, MessageHistory};
pub use message::{ChatMessage, Role};
