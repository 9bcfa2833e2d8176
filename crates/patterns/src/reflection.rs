//! Reflection — a producer drafts, a critic scores, repeat until good enough.
//!
//! Each exchange (one draft plus its critique) is a round. The loop stops as
//! soon as a critique reaches the target score, or after `max_rounds`
//! exchanges, whichever comes first. Every round is recorded in
//! [`EpisodicMemory`]; issues raised by the critic become long-term notes.
//!
//! The producer for round *n* > 1 sees the previous draft, the latest
//! feedback and the rendered memory.

use std::sync::Arc;

use async_trait::async_trait;
use patternkit_core::error::{Error, Result};
use patternkit_core::event::{DomainEvent, EventBus};
use patternkit_core::schema::{OutputSchema, StructuredOutput};
use patternkit_core::template::{PromptTemplate, Variables};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::invoker::ModelInvoker;
use crate::memory::{Episode, EpisodicMemory};

/// Structured feedback from the critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub overall_assessment: String,
    pub strengths: Vec<String>,
    pub issues: Vec<String>,
    /// 1-100; 80+ means ready to publish
    pub quality_score: u8,
}

impl Critique {
    /// The condensed feedback handed to the producer.
    pub fn feedback(&self) -> String {
        let mut parts = vec![
            format!("Overall: {}", self.overall_assessment),
            format!("Current score: {}/100", self.quality_score),
        ];
        parts.extend(self.issues.iter().map(|issue| format!("- {issue}")));
        parts.join("\n")
    }
}

impl StructuredOutput for Critique {
    fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "critique",
            json!({
                "type": "object",
                "properties": {
                    "overall_assessment": {
                        "type": "string",
                        "description": "Brief overall assessment of the draft"
                    },
                    "strengths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of strengths in the current draft"
                    },
                    "issues": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of specific issues that need improvement"
                    },
                    "quality_score": {
                        "type": "integer",
                        "description": "Quality score from 1-100, where 80+ means ready to publish. \
                                        Be specific and use the full range to show incremental improvements."
                    }
                },
                "required": ["overall_assessment", "strengths", "issues", "quality_score"],
                "additionalProperties": false
            }),
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=100).contains(&self.quality_score) {
            return Err(format!("quality_score {} is outside 1-100", self.quality_score));
        }
        Ok(())
    }
}

/// Everything the producer may use for one round.
#[derive(Debug, Clone, Copy)]
pub struct DraftRequest<'a> {
    pub round: usize,
    pub topic: &'a str,
    pub previous_draft: Option<&'a str>,
    pub feedback: Option<&'a str>,
    pub memory: &'a EpisodicMemory,
}

#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, request: &DraftRequest<'_>) -> Result<String>;
}

#[async_trait]
pub trait Critic: Send + Sync {
    async fn critique(&self, topic: &str, draft: &str) -> Result<Critique>;
}

const PRODUCER_PROMPT: &str = "You are a skilled blog writer creating engaging content.

{context}

Topic: {topic}

Requirements:
- Write a blog post of approximately 300-400 words
- Include a compelling hook in the opening
- Use clear structure with logical flow
- Make it engaging and readable
- Include a call-to-action at the end

{instruction}

Write the blog post:";

const REVISION_INSTRUCTION: &str = "Previous draft:
---
{previous_draft}
---

Editorial feedback on this draft:
{feedback}

{memory}Please revise the draft above to address all the issues mentioned in the feedback while preserving the strengths.";

const CRITIC_PROMPT: &str = "You are an experienced blog editor providing constructive feedback.

Evaluate the following blog post on the topic: \"{topic}\"

Blog Post:
{draft}

Evaluate the post based on these criteria:
1. **Clarity**: Is the writing clear and easy to understand?
2. **Structure**: Does it have good flow and logical organization?
3. **Engagement**: Is it interesting and does it hook the reader?
4. **Accuracy**: Is the content accurate and well-reasoned?
5. **Completeness**: Does it adequately cover the topic?
6. **Call-to-action**: Is there a clear and compelling CTA?

Provide structured feedback with:
- Overall assessment (brief summary)
- List of strengths (what's working well)
- List of specific issues to address (be specific and actionable)
- Quality score (1-100, where 80+ means ready to publish)

IMPORTANT: Use the full 1-100 range. Scores: 60-69 = significant issues, \
70-79 = good but needs work, 80+ = publication-ready.";

/// Blog writer backed by a model call.
pub struct ModelProducer {
    invoker: ModelInvoker,
}

impl ModelProducer {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    /// Build the prompt for a round.
    pub fn prompt(request: &DraftRequest<'_>) -> Result<String> {
        let (context, instruction) = match (request.previous_draft, request.feedback) {
            (Some(previous), Some(feedback)) => {
                let memory = request.memory.render();
                let memory = if memory.is_empty() {
                    memory
                } else {
                    format!("{memory}\n")
                };
                let vars = Variables::from([
                    ("previous_draft", previous),
                    ("feedback", feedback),
                    ("memory", memory.as_str()),
                ]);
                (
                    format!(
                        "This is iteration {}. You are revising your previous draft based on editorial feedback.",
                        request.round
                    ),
                    PromptTemplate::new(REVISION_INSTRUCTION).render(&vars)?,
                )
            }
            _ => (
                "This is your first draft.".to_string(),
                "Write a compelling first draft.".to_string(),
            ),
        };

        let vars = Variables::from([
            ("context", context.as_str()),
            ("topic", request.topic),
            ("instruction", instruction.as_str()),
        ]);
        PromptTemplate::new(PRODUCER_PROMPT).render(&vars)
    }
}

#[async_trait]
impl Producer for ModelProducer {
    async fn produce(&self, request: &DraftRequest<'_>) -> Result<String> {
        let prompt = Self::prompt(request)?;
        let draft = self.invoker.invoke_text(&prompt).await?;
        Ok(draft.trim().to_string())
    }
}

/// Blog editor backed by a structured model call.
pub struct ModelCritic {
    invoker: ModelInvoker,
}

impl ModelCritic {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl Critic for ModelCritic {
    async fn critique(&self, topic: &str, draft: &str) -> Result<Critique> {
        let vars = Variables::from([("topic", topic), ("draft", draft)]);
        let prompt = PromptTemplate::new(CRITIC_PROMPT).render(&vars)?;
        self.invoker
            .invoke_structured(vec![patternkit_core::message::Message::user(prompt)])
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionOutcome {
    /// A critique reached the target score
    TargetReached,
    /// `max_rounds` exchanges ran without reaching the target
    RoundLimit,
}

/// One producer/critic exchange.
#[derive(Debug, Clone)]
pub struct RoundRecord {
    pub round: usize,
    pub draft: String,
    pub critique: Critique,
}

#[derive(Debug, Clone)]
pub struct ReflectionResult {
    pub final_draft: String,
    pub final_score: u8,
    pub rounds: usize,
    pub outcome: ReflectionOutcome,
    pub history: Vec<RoundRecord>,
    pub memory: EpisodicMemory,
}

pub struct ReflectionLoop {
    producer: Arc<dyn Producer>,
    critic: Arc<dyn Critic>,
    max_rounds: usize,
    target_score: u8,
    episodic_capacity: usize,
    event_bus: Arc<EventBus>,
}

impl ReflectionLoop {
    pub fn new(producer: Arc<dyn Producer>, critic: Arc<dyn Critic>) -> Self {
        Self {
            producer,
            critic,
            max_rounds: 10,
            target_score: 80,
            episodic_capacity: 3,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Model-backed blog writer and editor sharing one invoker.
    pub fn with_model(invoker: ModelInvoker) -> Self {
        let event_bus = invoker.event_bus().clone();
        Self::new(
            Arc::new(ModelProducer::new(invoker.clone())),
            Arc::new(ModelCritic::new(invoker)),
        )
        .with_event_bus(event_bus)
    }

    /// At least one round always runs.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_target_score(mut self, target_score: u8) -> Self {
        self.target_score = target_score;
        self
    }

    pub fn with_episodic_capacity(mut self, capacity: usize) -> Self {
        self.episodic_capacity = capacity;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Fails with a configuration error before any model call when the
    /// target score is outside 1..=100.
    pub async fn run(&self, topic: &str) -> Result<ReflectionResult> {
        if !(1..=100).contains(&self.target_score) {
            return Err(Error::Config {
                message: format!("target score {} must be between 1 and 100", self.target_score),
            });
        }

        info!(
            max_rounds = self.max_rounds,
            target_score = self.target_score,
            "Starting reflection loop"
        );

        let mut memory = EpisodicMemory::new(self.episodic_capacity);
        let mut history: Vec<RoundRecord> = Vec::new();
        let mut draft = String::new();
        let mut feedback = String::new();
        let mut score = 0;
        let mut outcome = ReflectionOutcome::RoundLimit;

        for round in 1..=self.max_rounds {
            let request = DraftRequest {
                round,
                topic,
                previous_draft: (round > 1).then_some(draft.as_str()),
                feedback: (round > 1).then_some(feedback.as_str()),
                memory: &memory,
            };
            let new_draft = self.producer.produce(&request).await?;
            let critique = self.critic.critique(topic, &new_draft).await?;
            score = critique.quality_score;
            debug!(round, score, issues = critique.issues.len(), "Draft critiqued");

            feedback = critique.feedback();
            memory.record(Episode {
                round,
                attempt: new_draft.clone(),
                critique: feedback.clone(),
                score,
            });
            for issue in &critique.issues {
                memory.add_note(issue);
            }
            self.event_bus.publish(DomainEvent::ReflectionRound {
                round,
                score,
                timestamp: chrono::Utc::now(),
            });

            history.push(RoundRecord {
                round,
                draft: new_draft.clone(),
                critique,
            });
            draft = new_draft;

            if score >= self.target_score {
                outcome = ReflectionOutcome::TargetReached;
                break;
            }
        }

        info!(rounds = history.len(), score, outcome = ?outcome, "Reflection loop finished");
        Ok(ReflectionResult {
            final_draft: draft,
            final_score: score,
            rounds: history.len(),
            outcome,
            history,
            memory,
        })
    }
}
