//! Model invoker — one prompt in, one model reply out.
//!
//! Every pattern talks to the text-generation service through a
//! [`ModelInvoker`]. Each `invoke_*` method performs exactly one provider
//! call; transport failures surface as [`Error::ServiceUnavailable`] and
//! replies that do not fit the requested shape as [`Error::SchemaViolation`].

use std::sync::Arc;

use patternkit_core::error::{Error, Result};
use patternkit_core::event::{DomainEvent, EventBus};
use patternkit_core::message::Message;
use patternkit_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use patternkit_core::schema::{self, OutputSchema, StructuredOutput};
use patternkit_core::tool::ToolCall;
use tracing::debug;

/// What the model produced for a tool-enabled request.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// A final text answer
    Text(String),
    /// One or more tool requests, with any accompanying reasoning text
    ToolCalls { thought: String, calls: Vec<ToolCall> },
}

/// Sends rendered prompts to a provider.
#[derive(Clone)]
pub struct ModelInvoker {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Arc<EventBus>,
}

impl ModelInvoker {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Publish `ResponseGenerated` events on this bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Send a single user prompt and return the reply text.
    pub async fn invoke_text(&self, prompt: &str) -> Result<String> {
        self.invoke_messages_text(vec![Message::user(prompt)]).await
    }

    /// Send a message list and return the reply text.
    pub async fn invoke_messages_text(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.send(messages, Vec::new(), None).await?;
        Ok(response.message.content)
    }

    /// Ask for a structured record of type `T`.
    pub async fn invoke_structured<T: StructuredOutput>(&self, messages: Vec<Message>) -> Result<T> {
        self.invoke_structured_with_hint(messages, T::output_schema())
            .await
    }

    /// Ask for a structured record of type `T`, sending `hint` as the
    /// request schema. The reply is still checked against `T`'s own schema,
    /// so the hint may be narrower (e.g. an enum of allowed labels).
    pub async fn invoke_structured_with_hint<T: StructuredOutput>(
        &self,
        messages: Vec<Message>,
        hint: OutputSchema,
    ) -> Result<T> {
        let response = self.send(messages, Vec::new(), Some(hint)).await?;
        schema::parse_structured::<T>(&response.message.content)
    }

    /// Ask for JSON matching a schema known only at runtime.
    pub async fn invoke_with_schema(
        &self,
        messages: Vec<Message>,
        output_schema: &OutputSchema,
    ) -> Result<serde_json::Value> {
        let response = self
            .send(messages, Vec::new(), Some(output_schema.clone()))
            .await?;
        output_schema.parse_value(&response.message.content)
    }

    /// Offer tools to the model and report what it chose to do.
    pub async fn invoke_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelOutput> {
        let response = self.send(messages, tools, None).await?;
        let message = response.message;

        if !message.requests_tools() {
            return Ok(ModelOutput::Text(message.content));
        }

        let calls = message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = parse_arguments(&tc.arguments).map_err(|e| {
                    Error::schema(format!("tool_call:{}", tc.name), format!("invalid arguments: {e}"))
                })?;
                Ok(ToolCall {
                    id: tc.id,
                    name: tc.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelOutput::ToolCalls {
            thought: message.content,
            calls,
        })
    }

    async fn send(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        response_schema: Option<OutputSchema>,
    ) -> Result<ProviderResponse> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
            response_schema,
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            "Invoking model"
        );

        let response = self.provider.complete(request).await?;

        self.event_bus.publish(DomainEvent::ResponseGenerated {
            model: response.model.clone(),
            tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
            timestamp: chrono::Utc::now(),
        });

        Ok(response)
    }
}

/// Empty argument strings mean "no arguments".
fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}
