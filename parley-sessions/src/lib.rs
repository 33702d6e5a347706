//! Conversation sessions for parley
//!
//! This crate provides the per-conversation turn protocol and the registry
//! that owns every live session.

pub mod conversation;
pub mod error;
pub mod reaper;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use conversation::{decode_transcript, ConversationSession, TurnOutcome};
pub use error::{Result, SessionError};
pub use reaper::SessionReaper;
pub use registry::{SessionHandle, SessionRegistry};
