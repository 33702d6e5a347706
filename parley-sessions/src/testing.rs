//! Scripted provider for unit tests

use async_trait::async_trait;
use parley_providers::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ChoiceMessage, LLMProvider,
    ProviderClient, ProviderResult, SessionSettings, Usage,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Returns queued results in order, then `"ok"` replies worth one token
pub struct ScriptedProvider {
    script: parking_lot::Mutex<VecDeque<ProviderResult<ChatCompletionResponse>>>,
    requests: parking_lot::Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: parking_lot::Mutex::new(VecDeque::new()),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, response: ChatCompletionResponse) {
        self.script.lock().push_back(Ok(response));
    }

    pub fn push_err(&self, error: parley_providers::ProviderError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, request: ChatCompletionRequest) -> ProviderResult<ChatCompletionResponse> {
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(reply("ok", 1)))
    }

    fn get_default_model(&self) -> String {
        "scripted".to_string()
    }
}

/// A one-choice response worth `total_tokens`
pub fn reply(content: &str, total_tokens: u64) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: None,
        model: None,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage::assistant(content),
            finish_reason: Some("stop".to_string()),
        }],
        usage: Usage {
            prompt_tokens: 0,
            completion_tokens: total_tokens,
            total_tokens,
        },
        messages: Vec::new(),
    }
}

pub fn client(provider: Arc<ScriptedProvider>) -> ProviderClient {
    ProviderClient::new(
        provider,
        SessionSettings {
            model: "glm-4.5".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: "You are a helpful assistant.".to_string(),
            timeout: None,
        },
    )
}
