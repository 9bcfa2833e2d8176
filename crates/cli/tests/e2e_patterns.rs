//! End-to-end tests — patterns wired the way the CLI wires them, against a
//! scripted provider instead of the network.

use std::sync::{Arc, Mutex};

use patternkit_config::{AppConfig, ConfigError, FailurePolicy};
use patternkit_core::error::{Error, ProviderError};
use patternkit_core::event::{DomainEvent, EventBus};
use patternkit_core::message::{Message, MessageToolCall, Role};
use patternkit_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use patternkit_core::template::Variables;
use patternkit_patterns::{
    ContentTeam, DispatchState, ModelInvoker, Planner, ReflectionLoop, ReflectionOutcome,
    StopReason, ToolDispatcher, blog_content_fanout, customer_support_router, product_launch,
};

// ── Scripted provider ───────────────────────────────────────────────────

struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| reply(Message::assistant(*t))).collect())
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            })
    }
}

fn reply(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 20,
            completion_tokens: 10,
            total_tokens: 30,
        }),
        model: "gpt-4o-mini".into(),
    }
}

fn tool_request(calls: &[(&str, &str, serde_json::Value)]) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = calls
        .iter()
        .map(|(id, name, args)| MessageToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: args.to_string(),
        })
        .collect();
    reply(message)
}

fn invoker(provider: Arc<ScriptedProvider>) -> ModelInvoker {
    ModelInvoker::new(provider, "gpt-4o-mini")
}

// ── Configuration ───────────────────────────────────────────────────────

#[test]
fn missing_api_key_is_fatal_before_any_call() {
    let mut config = AppConfig::default();
    config.apply_env(|_| None);

    assert!(matches!(config.require_api_key(), Err(ConfigError::MissingApiKey)));
    let err = patternkit_providers::build_from_config(&config).err().unwrap();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn env_key_builds_provider() {
    let mut config = AppConfig::default();
    config.apply_env(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()));

    let provider = patternkit_providers::build_from_config(&config).unwrap();
    assert_eq!(provider.name(), "openai");
}

// ── Tool use ────────────────────────────────────────────────────────────

#[tokio::test]
async fn calculator_round_trip_with_builtin_tools() {
    let provider = ScriptedProvider::new(vec![
        tool_request(&[(
            "call_1",
            "calculator",
            serde_json::json!({"operation": "multiply", "a": 1234, "b": 56}),
        )]),
        reply(Message::assistant("1,234 multiplied by 56 is 69,104.")),
    ]);
    let bus = Arc::new(EventBus::new(32));
    let mut rx = bus.subscribe();
    let dispatcher = ToolDispatcher::new(
        invoker(provider.clone()).with_event_bus(bus),
        Arc::new(patternkit_tools::default_registry()),
    );

    let result = dispatcher.run("What is 1,234 multiplied by 56?").await.unwrap();

    assert_eq!(result.stop_reason, StopReason::Answered);
    assert_eq!(result.answer, "1,234 multiplied by 56 is 69,104.");
    assert_eq!(result.invocations[0].output, "The result of 1234 multiply 56 is: 69104");
    assert_eq!(
        result.transitions,
        vec![
            DispatchState::AwaitingModel,
            DispatchState::ToolRequested,
            DispatchState::ToolExecuted,
            DispatchState::AwaitingModel,
            DispatchState::Done,
        ]
    );

    // The second request carries the tool result, tagged with the call id
    let requests = provider.requests();
    assert_eq!(requests[0].tools.len(), 2);
    let tool_msg = requests[1].messages.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));

    let mut saw_tool_event = false;
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::ToolExecuted { tool_name, success, .. } = event.as_ref() {
            assert_eq!(tool_name, "calculator");
            assert!(success);
            saw_tool_event = true;
        }
    }
    assert!(saw_tool_event);
}

#[tokio::test]
async fn two_weather_lookups_in_one_turn() {
    let provider = ScriptedProvider::new(vec![
        tool_request(&[
            ("call_tokyo", "get_weather", serde_json::json!({"city": "Tokyo"})),
            ("call_london", "get_weather", serde_json::json!({"city": "london"})),
        ]),
        reply(Message::assistant("Tokyo is 7 degrees warmer.")),
    ]);
    let dispatcher = ToolDispatcher::new(
        invoker(provider),
        Arc::new(patternkit_tools::default_registry()),
    );

    let result = dispatcher.run("Temperature difference?").await.unwrap();
    assert_eq!(result.invocations.len(), 2);
    assert!(result.invocations[0].output.starts_with("Weather in Tokyo:"));
    assert!(result.invocations[1].output.starts_with("Weather in London:"));
}

#[tokio::test]
async fn unknown_tool_fails_the_run() {
    let provider = ScriptedProvider::new(vec![tool_request(&[(
        "call_x",
        "send_email",
        serde_json::json!({}),
    )])]);
    let dispatcher = ToolDispatcher::new(
        invoker(provider),
        Arc::new(patternkit_tools::default_registry()),
    );

    let err = dispatcher.run("Email my boss").await.unwrap_err();
    assert!(matches!(err, Error::UnknownTool(ref name) if name == "send_email"));
}

// ── Chaining, routing, fan-out ──────────────────────────────────────────

#[tokio::test]
async fn product_launch_chain() {
    let provider = ScriptedProvider::texts(&[
        r#"{"name": "AquaMind", "reasoning": "Smart and watery"}"#,
        "Hydration, remembered.",
        "AquaMind tracks every sip.",
    ]);

    let result = product_launch(invoker(provider.clone()))
        .run(Variables::from([("product_description", "A smart bottle")]))
        .await
        .unwrap();

    assert_eq!(result.variables.get("slogan"), Some("Hydration, remembered."));
    assert_eq!(result.final_text(), Some("AquaMind tracks every sip."));
    assert_eq!(provider.requests().len(), 3);
}

#[tokio::test]
async fn routing_with_configured_fallback() {
    let mut config = AppConfig::default();
    config.routing.fallback_category = Some("general".into());

    let provider = ScriptedProvider::texts(&[
        r#"{"category": "partnerships", "confidence": "low", "reasoning": "Unsure"}"#,
        "Thanks for reaching out!",
    ]);
    let mut router = customer_support_router(invoker(provider));
    if let Some(fallback) = &config.routing.fallback_category {
        router = router.with_fallback(fallback);
    }

    let routed = router.run("Can we partner up?").await.unwrap();
    assert!(routed.fell_back);
    assert_eq!(routed.handled_by, "general");
    assert_eq!(routed.response, "Thanks for reaching out!");
}

#[tokio::test]
async fn fan_out_collects_failures_when_configured() {
    // Scripted replies are handed out in poll order; the last branch gets
    // the exhausted-script error.
    let provider = ScriptedProvider::texts(&["t", "m", "s"]);
    let fanout = blog_content_fanout(invoker(provider)).with_policy(FailurePolicy::CollectAll);

    let result = fanout
        .run(&Variables::from([("topic", "Rust")]))
        .await
        .unwrap();

    assert_eq!(result.outputs.len(), 3);
    assert_eq!(result.failures.len(), 1);
    assert!(matches!(
        result.failures[0].error,
        Error::ServiceUnavailable(ProviderError::ApiError { status_code: 500, .. })
    ));
}

// ── Reflection, planning, collaboration ─────────────────────────────────

#[tokio::test]
async fn reflection_stops_at_round_limit() {
    let critique = r#"{"overall_assessment": "Meh", "strengths": [], "issues": ["Flat"], "quality_score": 55}"#;
    let provider = ScriptedProvider::texts(&["d1", critique, "d2", critique]);

    let result = ReflectionLoop::with_model(invoker(provider))
        .with_max_rounds(2)
        .run("Topic")
        .await
        .unwrap();

    assert_eq!(result.outcome, ReflectionOutcome::RoundLimit);
    assert_eq!(result.rounds, 2);
    assert_eq!(result.final_draft, "d2");
    assert_eq!(result.memory.notes(), ["Flat"]);
}

#[tokio::test]
async fn planner_rejects_forward_dependencies() {
    let plan = serde_json::json!({
        "goal": "g",
        "summary": "s",
        "steps": [
            {"step_number": 1, "description": "a", "dependencies": [2], "estimated_effort": "1h", "rationale": "r"},
            {"step_number": 2, "description": "b", "estimated_effort": "1h", "rationale": "r"}
        ],
        "total_estimated_effort": "2h"
    })
    .to_string();
    let provider = ScriptedProvider::texts(&[&plan]);

    let err = Planner::new(invoker(provider)).plan("g", "").await.unwrap_err();
    assert!(matches!(err, Error::SchemaViolation { ref schema, .. } if schema == "plan"));
}

#[tokio::test]
async fn content_team_runs_three_roles() {
    let notes = r#"{"topic": "T", "key_points": ["k"], "sources": ["docs"], "summary": "S"}"#;
    let provider = ScriptedProvider::texts(&[notes, "draft", "final"]);

    let result = ContentTeam::new(invoker(provider.clone())).run("T").await.unwrap();
    assert_eq!(result.final_post, "final");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.messages[0].role == Role::System));
}
