//! Tool use pattern — the model decides when to call local tools.
//!
//! The dispatcher is a small state machine:
//!
//! ```text
//! AwaitingModel ──tool calls──▶ ToolRequested ──run──▶ ToolExecuted ──▶ AwaitingModel
//!       │
//!       └──────── text ───────▶ Done
//! ```
//!
//! Tool output (or an `Error: …` line when a tool fails) is appended as a
//! tool message and the model is asked again. A tool name that is not in
//! the registry aborts the run with [`Error::UnknownTool`]. The number of
//! model turns that request tools is bounded; when the bound is hit the run
//! ends with [`StopReason::IterationLimit`].

use std::sync::Arc;
use std::time::Instant;

use patternkit_core::error::{Error, Result};
use patternkit_core::event::DomainEvent;
use patternkit_core::message::{Message, MessageToolCall};
use patternkit_core::tool::{ToolCall, ToolRegistry};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::invoker::{ModelInvoker, ModelOutput};

/// Answer returned when the iteration bound is exhausted.
pub const ITERATION_LIMIT_ANSWER: &str = "Maximum iterations reached";

/// States of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    AwaitingModel,
    ToolRequested,
    ToolExecuted,
    Done,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The model answered in plain text
    Answered,
    /// The model kept requesting tools until the bound was hit
    IterationLimit,
}

/// One executed tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub iteration: usize,
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub output: String,
    pub success: bool,
    pub duration_ms: u64,
}

/// The result of a tool-use run.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub answer: String,
    pub stop_reason: StopReason,
    /// Every state the loop passed through, in order
    pub transitions: Vec<DispatchState>,
    pub invocations: Vec<ToolInvocation>,
    /// Model turns that requested tools
    pub iterations: usize,
    /// Full conversation, including tool messages
    pub messages: Vec<Message>,
}

/// Drives the model ⇄ tool loop.
pub struct ToolDispatcher {
    invoker: ModelInvoker,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    system_prompt: Option<String>,
}

impl ToolDispatcher {
    pub fn new(invoker: ModelInvoker, tools: Arc<ToolRegistry>) -> Self {
        Self {
            invoker,
            tools,
            max_iterations: 5,
            system_prompt: None,
        }
    }

    /// Set the maximum number of tool-requesting model turns.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Run the loop for a single user request.
    pub async fn run(&self, user_input: &str) -> Result<DispatchResult> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(user_input));
        self.run_messages(messages).await
    }

    /// Run the loop starting from an existing conversation.
    pub async fn run_messages(&self, mut messages: Vec<Message>) -> Result<DispatchResult> {
        info!(
            tools = self.tools.len(),
            max_iterations = self.max_iterations,
            "Starting tool-use run"
        );

        let definitions = self.tools.definitions();
        let mut transitions = vec![DispatchState::AwaitingModel];
        let mut invocations = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let output = self
                .invoker
                .invoke_with_tools(messages.clone(), definitions.clone())
                .await?;

            let (thought, calls) = match output {
                ModelOutput::Text(answer) => {
                    messages.push(Message::assistant(&answer));
                    transitions.push(DispatchState::Done);
                    info!(iterations, tool_calls = invocations.len(), "Tool-use run answered");
                    return Ok(DispatchResult {
                        answer,
                        stop_reason: StopReason::Answered,
                        transitions,
                        invocations,
                        iterations,
                        messages,
                    });
                }
                ModelOutput::ToolCalls { thought, calls } => (thought, calls),
            };

            iterations += 1;
            transitions.push(DispatchState::ToolRequested);
            debug!(iteration = iterations, count = calls.len(), "Model requested tools");

            // Reject the whole batch before running anything.
            if let Some(unknown) = calls.iter().find(|c| !self.tools.contains(&c.name)) {
                warn!(tool = %unknown.name, "Model requested an unregistered tool");
                return Err(Error::UnknownTool(unknown.name.clone()));
            }

            messages.push(assistant_with_calls(thought, &calls));

            for call in &calls {
                let invocation = self.execute(iterations, call).await;
                messages.push(Message::tool_result(&call.id, &invocation.output));
                transitions.push(DispatchState::ToolExecuted);
                invocations.push(invocation);
            }

            transitions.push(DispatchState::AwaitingModel);
        }

        warn!(
            max_iterations = self.max_iterations,
            "Max tool iterations reached"
        );
        transitions.push(DispatchState::Done);
        Ok(DispatchResult {
            answer: ITERATION_LIMIT_ANSWER.to_string(),
            stop_reason: StopReason::IterationLimit,
            transitions,
            invocations,
            iterations,
            messages,
        })
    }

    async fn execute(&self, iteration: usize, call: &ToolCall) -> ToolInvocation {
        let start = Instant::now();
        let result = self.tools.execute(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, success) = match result {
            Ok(tool_result) => {
                if !tool_result.success {
                    debug!(tool = %call.name, output = %tool_result.output, "Tool reported failure");
                }
                (tool_result.output, tool_result.success)
            }
            Err(e) => {
                // Reported to the model so it can recover
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (format!("Error: {e}"), false)
            }
        };

        self.invoker.event_bus().publish(DomainEvent::ToolExecuted {
            tool_name: call.name.clone(),
            success,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        ToolInvocation {
            iteration,
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            output,
            success,
            duration_ms,
        }
    }
}

fn assistant_with_calls(thought: String, calls: &[ToolCall]) -> Message {
    let mut message = Message::assistant(thought);
    message.tool_calls = calls
        .iter()
        .map(|c| MessageToolCall {
            id: c.id.clone(),
            name: c.name.clone(),
            arguments: c.arguments.to_string(),
        })
        .collect();
    message
}
