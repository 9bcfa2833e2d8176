//! Routing — classify an input, then hand it to exactly one handler.
//!
//! A [`Classifier`] picks a category label from the router's registered set;
//! the [`RouteHandler`] registered for that label produces the response.
//! Labels are matched case-insensitively. A label outside the set is an
//! [`Error::UnrecognizedRoute`] unless a fallback category is configured.

use std::sync::Arc;

use async_trait::async_trait;
use patternkit_core::error::{Error, Result};
use patternkit_core::event::{DomainEvent, EventBus};
use patternkit_core::schema::{OutputSchema, StructuredOutput};
use patternkit_core::template::{ChatTemplate, Variables};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::invoker::ModelInvoker;

/// A label the router can dispatch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCategory {
    pub name: String,
    pub description: String,
}

impl RouteCategory {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A classifier's verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub category: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

impl RouteDecision {
    /// The schema sent to the model, with `category` limited to `categories`.
    pub fn schema_for(categories: &[RouteCategory]) -> OutputSchema {
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        OutputSchema::new(
            "route_decision",
            json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "enum": names,
                        "description": "The category of the input"
                    },
                    "confidence": {
                        "type": "string",
                        "enum": ["high", "medium", "low"],
                        "description": "Confidence level: high, medium, or low"
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Brief explanation of why this category was chosen"
                    }
                },
                "required": ["category", "confidence", "reasoning"],
                "additionalProperties": false
            }),
        )
    }
}

impl StructuredOutput for RouteDecision {
    // Open category set: membership is the router's call, not the parser's.
    fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "route_decision",
            json!({
                "type": "object",
                "properties": {
                    "category": { "type": "string" },
                    "confidence": { "type": "string" },
                    "reasoning": { "type": "string" }
                },
                "required": ["category", "confidence", "reasoning"]
            }),
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category must not be empty".into());
        }
        Ok(())
    }
}

/// Assigns an input to one category.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, input: &str, categories: &[RouteCategory]) -> Result<RouteDecision>;
}

/// Produces the response for one category.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, input: &str) -> Result<String>;
}

/// Classifies with a structured model call.
///
/// The template receives `{categories}` (one `- name: description` line per
/// category) and `{input}`.
pub struct ModelClassifier {
    invoker: ModelInvoker,
    template: ChatTemplate,
}

impl ModelClassifier {
    pub fn new(invoker: ModelInvoker, template: impl Into<ChatTemplate>) -> Self {
        Self {
            invoker,
            template: template.into(),
        }
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    async fn classify(&self, input: &str, categories: &[RouteCategory]) -> Result<RouteDecision> {
        let listing = categories
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");
        let vars = Variables::from([("categories", listing.as_str()), ("input", input)]);
        let messages = self.template.render(&vars)?;
        self.invoker
            .invoke_structured_with_hint(messages, RouteDecision::schema_for(categories))
            .await
    }
}

/// Answers with a model call on a template that takes `{input}`.
pub struct PromptHandler {
    invoker: ModelInvoker,
    template: ChatTemplate,
}

impl PromptHandler {
    pub fn new(invoker: ModelInvoker, template: impl Into<ChatTemplate>) -> Self {
        Self {
            invoker,
            template: template.into(),
        }
    }
}

#[async_trait]
impl RouteHandler for PromptHandler {
    async fn handle(&self, input: &str) -> Result<String> {
        let messages = self.template.render(&Variables::from([("input", input)]))?;
        let text = self.invoker.invoke_messages_text(messages).await?;
        Ok(text.trim().to_string())
    }
}

struct Route {
    category: RouteCategory,
    handler: Arc<dyn RouteHandler>,
}

/// What the router did with an input.
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub decision: RouteDecision,
    /// Category whose handler ran
    pub handled_by: String,
    /// True when the classifier's label was unknown and the fallback ran
    pub fell_back: bool,
    pub response: String,
}

pub struct Router {
    classifier: Arc<dyn Classifier>,
    routes: Vec<Route>,
    fallback: Option<String>,
    event_bus: Arc<EventBus>,
}

impl Router {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            routes: Vec::new(),
            fallback: None,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Register a category and its handler. Re-registering a name replaces it.
    pub fn route(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> Self {
        let category = RouteCategory::new(name, description);
        self.routes.retain(|r| r.category.name != category.name);
        self.routes.push(Route { category, handler });
        self
    }

    /// Run this category's handler for labels outside the registered set.
    pub fn with_fallback(mut self, category: impl Into<String>) -> Self {
        self.fallback = Some(category.into());
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn categories(&self) -> Vec<RouteCategory> {
        self.routes.iter().map(|r| r.category.clone()).collect()
    }

    /// Classify `input` and run exactly one handler.
    pub async fn run(&self, input: &str) -> Result<RoutedResponse> {
        if self.routes.is_empty() {
            return Err(Error::Config {
                message: "router has no categories".into(),
            });
        }

        let categories = self.categories();
        let decision = self.classifier.classify(input, &categories).await?;
        info!(
            category = %decision.category,
            confidence = %decision.confidence,
            "Input classified"
        );

        let (route, fell_back) = match self.find(&decision.category) {
            Some(route) => (route, false),
            None => {
                let fallback = self.fallback.as_deref().ok_or_else(|| Error::UnrecognizedRoute {
                    label: decision.category.clone(),
                })?;
                let route = self.find(fallback).ok_or_else(|| Error::Config {
                    message: format!("fallback category '{fallback}' is not registered"),
                })?;
                warn!(
                    label = %decision.category,
                    fallback = %route.category.name,
                    "Unrecognized route label, using fallback"
                );
                (route, true)
            }
        };

        self.event_bus.publish(DomainEvent::RouteSelected {
            category: route.category.name.clone(),
            timestamp: chrono::Utc::now(),
        });

        let response = route.handler.handle(input).await?;
        Ok(RoutedResponse {
            handled_by: route.category.name.clone(),
            decision,
            fell_back,
            response,
        })
    }

    fn find(&self, label: &str) -> Option<&Route> {
        let label = label.trim();
        self.routes
            .iter()
            .find(|r| r.category.name.eq_ignore_ascii_case(label))
    }
}

const ROUTER_PROMPT: &str = "You are a customer service routing assistant. \
Analyze the customer inquiry and classify it into one of these categories:

Categories:
{categories}

Customer Inquiry: {input}

Classify this inquiry and provide your confidence level and reasoning.";

const TECHNICAL_SUPPORT_PROMPT: &str = "You are a technical support specialist. \
Help the customer with their technical issue.

Customer Issue: {input}

Provide a helpful technical response with:
1. Acknowledgment of the issue
2. Possible causes
3. Step-by-step troubleshooting steps
4. When to escalate to engineering

Keep your response concise (3-4 sentences).";

const BILLING_PROMPT: &str = "You are a billing specialist. \
Help the customer with their billing question or issue.

Customer Question: {input}

Provide a helpful billing response with:
1. Acknowledgment of their concern
2. Clear explanation of billing details
3. Next steps or resolution
4. Contact information for complex billing issues

Keep your response concise (3-4 sentences).";

const PRODUCT_INFO_PROMPT: &str = "You are a product specialist. \
Answer the customer's question about product features and specifications.

Customer Question: {input}

Provide a helpful product response with:
1. Direct answer to their question
2. Relevant product details
3. Related features they might find useful
4. Where to find more detailed documentation

Keep your response concise (3-4 sentences).";

const GENERAL_PROMPT: &str = "You are a friendly customer service representative. \
Help the customer with their general inquiry.

Customer Inquiry: {input}

Provide a helpful, friendly response that:
1. Addresses their question or feedback
2. Provides relevant information
3. Directs them to appropriate resources if needed

Keep your response concise (3-4 sentences).";

/// The four-way customer service router.
pub fn customer_support_router(invoker: ModelInvoker) -> Router {
    let handler = |prompt: &str| -> Arc<dyn RouteHandler> {
        Arc::new(PromptHandler::new(invoker.clone(), prompt))
    };

    Router::new(Arc::new(ModelClassifier::new(invoker.clone(), ROUTER_PROMPT)))
        .with_event_bus(invoker.event_bus().clone())
        .route(
            "technical_support",
            "Issues with product functionality, bugs, errors, troubleshooting",
            handler(TECHNICAL_SUPPORT_PROMPT),
        )
        .route(
            "billing",
            "Payment issues, invoices, refunds, pricing questions",
            handler(BILLING_PROMPT),
        )
        .route(
            "product_info",
            "Questions about features, specifications, compatibility, availability",
            handler(PRODUCT_INFO_PROMPT),
        )
        .route(
            "general",
            "General questions, feedback, or inquiries that don't fit other categories",
            handler(GENERAL_PROMPT),
        )
}
