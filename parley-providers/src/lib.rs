//! LLM provider integration for parley
//!
//! This crate provides the provider abstraction, an OpenAI-compatible HTTP
//! client, and the per-conversation provider binding.

pub mod base;
pub mod client;
pub mod session;

pub use base::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ChoiceMessage, LLMProvider, Message,
    ProviderError, ProviderResult, Role, Usage,
};
pub use client::OpenAICompatClient;
pub use session::{ProviderClient, ProviderSession, SessionSettings};
