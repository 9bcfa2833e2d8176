//! Multi-agent collaboration — researcher, writer and editor in sequence.
//!
//! Each agent is a role with its own chat template sharing one invoker. The
//! researcher returns structured [`ResearchNotes`]; the writer turns them
//! into a draft; the editor polishes the draft.

use patternkit_core::error::Result;
use patternkit_core::schema::{OutputSchema, StructuredOutput};
use patternkit_core::template::{ChatTemplate, Variables};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::invoker::ModelInvoker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchNotes {
    pub topic: String,
    pub key_points: Vec<String>,
    /// Kinds of sources consulted
    pub sources: Vec<String>,
    pub summary: String,
}

impl ResearchNotes {
    /// Key points as a `- point` list.
    pub fn bullet_points(&self) -> String {
        self.key_points
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl StructuredOutput for ResearchNotes {
    fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "research_notes",
            json!({
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "The research topic" },
                    "key_points": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Key findings and important points"
                    },
                    "sources": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Types of sources consulted (simulated)"
                    },
                    "summary": { "type": "string", "description": "Brief summary of the research" }
                },
                "required": ["topic", "key_points", "sources", "summary"],
                "additionalProperties": false
            }),
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.key_points.is_empty() {
            return Err("research produced no key points".into());
        }
        Ok(())
    }
}

const RESEARCHER_SYSTEM: &str = "You are an expert researcher. \
Your role is to gather information on a given topic and organize it into structured research notes.

Your research should:
- Identify key concepts and important points
- Note relevant facts and data
- Organize information logically
- Provide a clear summary

You have access to knowledge from your training data. Simulate consulting various sources.";

const RESEARCHER_HUMAN: &str =
    "Research the following topic and provide structured notes:\n\nTopic: {topic}";

const WRITER_SYSTEM: &str = "You are an expert content writer. \
Your role is to transform research notes into engaging, well-written blog posts.

Your writing should:
- Be clear and engaging
- Have a logical flow with introduction, body, and conclusion
- Use the research accurately
- Be accessible to a general technical audience
- Include relevant examples or analogies

Transform dry research into compelling content.";

const WRITER_HUMAN: &str = "Using the following research notes, write an engaging blog post:

Topic: {topic}
Key Points:
{key_points}

Summary: {summary}

Write a complete blog post (400-600 words) based on this research.";

const EDITOR_SYSTEM: &str = "You are a meticulous editor. \
Your role is to review and polish written content for publication.

Your editing should focus on:
- Clarity and readability
- Grammar and punctuation
- Flow and coherence
- Removing redundancy
- Ensuring professional tone
- Adding polish and refinement

Provide the final, publication-ready version.";

const EDITOR_HUMAN: &str = "Review and edit the following blog post. Provide the final polished version:

{blog_draft}

Return the complete edited version.";

/// Outputs of every stage.
#[derive(Debug, Clone)]
pub struct CollaborationResult {
    pub research: ResearchNotes,
    pub draft: String,
    pub final_post: String,
}

pub struct ContentTeam {
    invoker: ModelInvoker,
    researcher: ChatTemplate,
    writer: ChatTemplate,
    editor: ChatTemplate,
}

impl ContentTeam {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker,
            researcher: ChatTemplate::new(RESEARCHER_HUMAN).with_system(RESEARCHER_SYSTEM),
            writer: ChatTemplate::new(WRITER_HUMAN).with_system(WRITER_SYSTEM),
            editor: ChatTemplate::new(EDITOR_HUMAN).with_system(EDITOR_SYSTEM),
        }
    }

    pub async fn research(&self, topic: &str) -> Result<ResearchNotes> {
        let messages = self.researcher.render(&Variables::from([("topic", topic)]))?;
        self.invoker.invoke_structured(messages).await
    }

    pub async fn write(&self, notes: &ResearchNotes) -> Result<String> {
        let key_points = notes.bullet_points();
        let vars = Variables::from([
            ("topic", notes.topic.as_str()),
            ("key_points", key_points.as_str()),
            ("summary", notes.summary.as_str()),
        ]);
        let draft = self
            .invoker
            .invoke_messages_text(self.writer.render(&vars)?)
            .await?;
        Ok(draft.trim().to_string())
    }

    pub async fn edit(&self, draft: &str) -> Result<String> {
        let messages = self.editor.render(&Variables::from([("blog_draft", draft)]))?;
        let edited = self.invoker.invoke_messages_text(messages).await?;
        Ok(edited.trim().to_string())
    }

    /// Research, write, then edit. Any stage failing stops the run.
    pub async fn run(&self, topic: &str) -> Result<CollaborationResult> {
        info!(topic, "Research phase");
        let research = self.research(topic).await?;

        info!(key_points = research.key_points.len(), "Writing phase");
        let draft = self.write(&research).await?;

        info!(draft_chars = draft.len(), "Editing phase");
        let final_post = self.edit(&draft).await?;

        Ok(CollaborationResult {
            research,
            draft,
            final_post,
        })
    }
}
