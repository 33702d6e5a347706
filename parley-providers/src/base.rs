//! Base trait and wire types for LLM providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use parley_core::session::{ChatMessage as Message, Role};

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Chat completion request as sent on the wire
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_id: String,
}

/// Chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
    /// Conversation transcript as the provider side sees it.
    ///
    /// Left untyped: some providers echo extra or partial entries here, and
    /// callers decide what to keep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<serde_json::Value>,
}

impl ChatCompletionResponse {
    /// First generated choice, the one surfaced to callers
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Reply text of the first choice
    pub fn reply(&self) -> Option<&str> {
        self.first_choice()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message carried by a choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default = "default_choice_role")]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

fn default_choice_role() -> String {
    Role::Assistant.as_str().to_string()
}

impl ChoiceMessage {
    /// Assistant message with the given content
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: default_choice_role(),
            content: Some(content.into()),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(&self, request: ChatCompletionRequest) -> ProviderResult<ChatCompletionResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}
