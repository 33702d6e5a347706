//! Per-conversation provider binding
//!
//! A [`ProviderSession`] pins one conversation's model parameters and
//! request id; a [`ProviderClient`] builds such sessions from shared
//! settings and a single provider handle.

use parley_core::config::Config;
use parley_core::session::Role;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::base::{
    ChatCompletionRequest, ChatCompletionResponse, LLMProvider, Message, ProviderError,
    ProviderResult,
};
use crate::client::OpenAICompatClient;

/// Parameters every new conversation starts with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: String,
    /// Deadline applied to each completion call
    pub timeout: Option<Duration>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            system_prompt: config.prompt.prompt.clone(),
            timeout: config.llm.request_timeout(),
        }
    }

    /// Same settings with another model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// One conversation's binding to the provider.
///
/// Model, temperature, token limit and request id are fixed at
/// construction.
pub struct ProviderSession {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    request_id: String,
    timeout: Option<Duration>,
}

impl ProviderSession {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        settings: &SessionSettings,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            request_id: request_id.into(),
            timeout: settings.timeout,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Send the full history and return the provider's response.
    ///
    /// The history must open with a system message. Provider failures are
    /// returned as-is, without retry. A response with no choices is an
    /// error. When the provider did not echo a transcript, `messages` is
    /// filled with the sent history followed by the first choice's message.
    pub async fn complete(&self, history: &[Message]) -> ProviderResult<ChatCompletionResponse> {
        match history.first() {
            Some(first) if first.role == Role::System => {}
            Some(first) => {
                return Err(ProviderError::InvalidRequest(format!(
                    "history must start with a system message, found {}",
                    first.role
                )))
            }
            None => {
                return Err(ProviderError::InvalidRequest(
                    "history is empty".to_string(),
                ))
            }
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: history.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            request_id: self.request_id.clone(),
        };

        debug!(
            session_id = %self.request_id,
            model = %self.model,
            messages = history.len(),
            "Requesting completion"
        );

        let call = self.provider.chat(request);
        let mut response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))??,
            None => call.await?,
        };

        let Some(choice) = response.first_choice() else {
            return Err(ProviderError::InvalidResponse(
                "No choices in response".to_string(),
            ));
        };

        if response.messages.is_empty() {
            let mut transcript = Vec::with_capacity(history.len() + 1);
            for message in history {
                transcript.push(serde_json::to_value(message)?);
            }
            transcript.push(serde_json::to_value(&choice.message)?);
            response.messages = transcript;
        }

        Ok(response)
    }
}

/// Builds [`ProviderSession`]s that share one provider handle
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    settings: SessionSettings,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: SessionSettings) -> Self {
        Self { provider, settings }
    }

    /// Build the HTTP client and settings from config
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let provider = OpenAICompatClient::from_config(&config.llm)?;
        Ok(Self::new(
            Arc::new(provider),
            SessionSettings::from_config(config),
        ))
    }

    /// Same provider handle with another model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            provider: self.provider.clone(),
            settings: self.settings.clone().with_model(model),
        }
    }

    /// A fresh provider session bound to `session_id`
    pub fn new_session(&self, session_id: impl Into<String>) -> ProviderSession {
        ProviderSession::new(self.provider.clone(), &self.settings, session_id)
    }

    /// Prompt new histories are seeded with
    pub fn system_prompt(&self) -> &str {
        &self.settings.system_prompt
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
