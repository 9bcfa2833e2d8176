//! Shared test utilities for pattern tests.

use std::sync::Mutex;
use std::time::Duration;

use patternkit_core::error::ProviderError;
use patternkit_core::message::{Message, MessageToolCall, Role};
use patternkit_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that returns scripted responses in sequence and records
/// every request it receives.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Plain text replies, one per call.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The `index`-th request received.
    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{index}, have {})",
                responses.len()
            );
        }
        requests.push(request);
        responses[index].clone()
    }
}

/// A provider that answers each prompt after a delay chosen by the prompt
/// content. Replies echo the last user message, so concurrent callers can
/// tell their answers apart.
pub struct EchoProvider {
    delays: Vec<(String, Duration)>,
    default_delay: Duration,
    fail_on: Option<String>,
}

impl EchoProvider {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            delays: Vec::new(),
            default_delay,
            fail_on: None,
        }
    }

    /// Prompts containing `needle` take `delay`.
    pub fn with_delay(mut self, needle: &str, delay: Duration) -> Self {
        self.delays.push((needle.to_string(), delay));
        self
    }

    /// Prompts containing `needle` fail with a network error.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let delay = self
            .delays
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, d)| *d)
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        if let Some(needle) = &self.fail_on {
            if prompt.contains(needle.as_str()) {
                return Err(ProviderError::Network(format!("refused: {needle}")));
            }
        }

        Ok(text_response(&format!("echo: {prompt}")))
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
