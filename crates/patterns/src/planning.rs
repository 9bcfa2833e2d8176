//! Planning — turn a goal into a validated, ordered list of steps.

use patternkit_core::error::Result;
use patternkit_core::schema::{OutputSchema, StructuredOutput};
use patternkit_core::template::{ChatTemplate, Variables};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::info;

use crate::invoker::ModelInvoker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub description: String,
    /// Earlier steps that must be finished first
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<u32>,
    pub estimated_effort: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    /// One-sentence overview of the approach
    pub summary: String,
    pub steps: Vec<PlanStep>,
    pub total_estimated_effort: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u32>, D::Error> {
    Ok(Option::<Vec<u32>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Plan {
    /// Console view of the plan.
    pub fn render(&self) -> String {
        let rule = "=".repeat(80);
        let mut out = format!(
            "Goal: {}\nStrategy: {}\nTotal Estimated Effort: {}\n\nPlan Steps:\n{rule}\n",
            self.goal, self.summary, self.total_estimated_effort
        );
        for step in &self.steps {
            out.push_str(&format!("\nStep {}: {}\n", step.step_number, step.description));
            out.push_str(&format!("  Effort: {}\n", step.estimated_effort));
            if !step.dependencies.is_empty() {
                let deps = step
                    .dependencies
                    .iter()
                    .map(|d| format!("Step {d}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("  Dependencies: {deps}\n"));
            }
            out.push_str(&format!("  Rationale: {}\n", step.rationale));
        }
        out.push_str(&format!("\n{rule}\n"));
        out
    }
}

impl StructuredOutput for Plan {
    fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "plan",
            json!({
                "type": "object",
                "properties": {
                    "goal": { "type": "string", "description": "The original goal to be achieved" },
                    "summary": { "type": "string", "description": "One-sentence overview of the approach" },
                    "steps": {
                        "type": "array",
                        "description": "Sequential list of steps to complete",
                        "items": {
                            "type": "object",
                            "properties": {
                                "step_number": {
                                    "type": "integer",
                                    "description": "The sequential number of this step"
                                },
                                "description": {
                                    "type": "string",
                                    "description": "Clear description of what needs to be done"
                                },
                                "dependencies": {
                                    "type": "array",
                                    "items": { "type": "integer" },
                                    "description": "Step numbers that must be completed before this step (if any)"
                                },
                                "estimated_effort": {
                                    "type": "string",
                                    "description": "Estimated time or effort (e.g., '2 hours', '1 day', '1 week')"
                                },
                                "rationale": {
                                    "type": "string",
                                    "description": "Brief explanation of why this step is necessary"
                                }
                            },
                            "required": ["step_number", "description", "estimated_effort", "rationale"]
                        }
                    },
                    "total_estimated_effort": {
                        "type": "string",
                        "description": "Total estimated time to complete all steps"
                    }
                },
                "required": ["goal", "summary", "steps", "total_estimated_effort"]
            }),
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.steps.is_empty() {
            return Err("plan has no steps".into());
        }
        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.step_number != expected {
                return Err(format!(
                    "step {} is out of sequence (expected {expected})",
                    step.step_number
                ));
            }
            if let Some(dep) = step
                .dependencies
                .iter()
                .find(|&&d| d == 0 || d >= step.step_number)
            {
                return Err(format!(
                    "step {} depends on step {dep}, which does not come before it",
                    step.step_number
                ));
            }
        }
        Ok(())
    }
}

const PLANNER_SYSTEM: &str = "You are an expert strategic planner. \
Your role is to break down complex goals into clear, actionable plans.

When given a goal, you should:
1. Analyze what needs to be accomplished
2. Identify the logical sequence of steps
3. Note any dependencies between steps
4. Estimate the effort required for each step
5. Provide rationale for why each step is necessary

Create plans that are:
- Concrete and actionable (not vague)
- Logically sequenced (with clear dependencies)
- Realistic in scope and effort estimates
- Complete (covering all aspects of the goal)

Remember: A good plan transforms a complex goal into a clear roadmap.";

const PLANNER_HUMAN: &str = "Create a detailed plan to achieve the following goal:

Goal: {goal}

{context}";

pub struct Planner {
    invoker: ModelInvoker,
    template: ChatTemplate,
}

impl Planner {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker,
            template: ChatTemplate::new(PLANNER_HUMAN).with_system(PLANNER_SYSTEM),
        }
    }

    /// Ask for a plan. `context` may be empty.
    pub async fn plan(&self, goal: &str, context: &str) -> Result<Plan> {
        info!(goal, "Planning");
        let vars = Variables::from([("goal", goal), ("context", context)]);
        let messages = self.template.render(&vars)?;
        let plan: Plan = self.invoker.invoke_structured(messages).await?;
        info!(steps = plan.steps.len(), "Plan ready");
        Ok(plan)
    }
}

/// The bundled example goals, as `(goal, context)` pairs.
pub const EXAMPLE_GOALS: [(&str, &str); 3] = [
    (
        "Build a user authentication system with email/password login",
        "Context: This is for a web application. We need secure authentication with password hashing.",
    ),
    (
        "Write a comprehensive blog series about AI agentic patterns",
        "Context: Target audience is software developers. Series should be 5 posts covering different patterns with code examples.",
    ),
    (
        "Learn React.js well enough to build production applications",
        "Context: I have 2 weeks available, 2-3 hours per day. I already know JavaScript and HTML/CSS.",
    ),
];
