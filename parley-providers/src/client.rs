//! OpenAI-compatible HTTP client implementation

use async_trait::async_trait;
use parley_core::config::LlmConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::base::{
    ChatCompletionRequest, ChatCompletionResponse, LLMProvider, ProviderError, ProviderResult,
};

/// Client for `/chat/completions` style endpoints (Zhipu, OpenAI, and
/// anything speaking the same dialect)
pub struct OpenAICompatClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
}

impl OpenAICompatClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> ProviderResult<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(ProviderError::ConfigError(
                "api base URL must not be empty".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_base,
            api_key,
            default_model: default_model.into(),
        })
    }

    /// Create a client from the `llm` config section
    pub fn from_config(config: &LlmConfig) -> ProviderResult<Self> {
        Self::new(
            Some(config.api_key.clone()),
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout(),
        )
    }

    /// Base URL requests are sent to
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn apply_auth(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => req_builder.bearer_auth(api_key),
            None => req_builder,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatClient {
    async fn chat(&self, request: ChatCompletionRequest) -> ProviderResult<ChatCompletionResponse> {
        debug!(
            request_id = %request.request_id,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request to {}",
            self.api_base
        );

        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_auth(self.client.post(&url).json(&request));

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&body)?;
        Ok(response_data)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}
