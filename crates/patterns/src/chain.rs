//! Prompt chaining — each step's output feeds the next step's prompt.
//!
//! A [`PromptChain`] is an ordered list of [`ChainStep`]s sharing one
//! variable map. After step *i* runs, its output is stored under the step's
//! `output_key`; structured steps also expose their top-level scalar fields
//! as `key.field`, so later templates can say `{product.name}`.

use patternkit_core::error::Result;
use patternkit_core::schema::OutputSchema;
use patternkit_core::template::{ChatTemplate, Variables};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::invoker::ModelInvoker;

/// One link in a chain.
#[derive(Debug, Clone)]
pub struct ChainStep {
    pub output_key: String,
    pub template: ChatTemplate,
    /// When set, the step asks for JSON matching this schema
    pub schema: Option<OutputSchema>,
}

impl ChainStep {
    /// A step whose output is free text.
    pub fn text(output_key: impl Into<String>, template: impl Into<ChatTemplate>) -> Self {
        Self {
            output_key: output_key.into(),
            template: template.into(),
            schema: None,
        }
    }

    /// A step whose output is a JSON object matching `schema`.
    pub fn structured(
        output_key: impl Into<String>,
        template: impl Into<ChatTemplate>,
        schema: OutputSchema,
    ) -> Self {
        Self {
            output_key: output_key.into(),
            template: template.into(),
            schema: Some(schema),
        }
    }
}

/// What a single step produced.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub key: String,
    /// Reply text (compact JSON for structured steps)
    pub text: String,
    /// Parsed reply for structured steps
    pub value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ChainResult {
    pub steps: Vec<StepOutput>,
    /// The final variable map, including every step's outputs
    pub variables: Variables,
}

impl ChainResult {
    pub fn output(&self, key: &str) -> Option<&StepOutput> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Text of the last step.
    pub fn final_text(&self) -> Option<&str> {
        self.steps.last().map(|s| s.text.as_str())
    }
}

/// Runs steps strictly in order.
pub struct PromptChain {
    invoker: ModelInvoker,
    steps: Vec<ChainStep>,
}

impl PromptChain {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: ChainStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step. The first failure aborts the chain.
    pub async fn run(&self, initial: Variables) -> Result<ChainResult> {
        info!(steps = self.steps.len(), "Running prompt chain");
        let mut variables = initial;
        let mut outputs = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = index + 1, key = %step.output_key, "Chain step");
            let messages = step.template.render(&variables)?;

            let output = match &step.schema {
                Some(schema) => {
                    let value = self.invoker.invoke_with_schema(messages, schema).await?;
                    flatten_into(&mut variables, &step.output_key, &value);
                    StepOutput {
                        key: step.output_key.clone(),
                        text: value.to_string(),
                        value: Some(value),
                    }
                }
                None => StepOutput {
                    key: step.output_key.clone(),
                    text: self.invoker.invoke_messages_text(messages).await?.trim().to_string(),
                    value: None,
                },
            };

            variables.insert(&step.output_key, &output.text);
            outputs.push(output);
        }

        Ok(ChainResult {
            steps: outputs,
            variables,
        })
    }
}

/// Expose top-level scalar fields of an object as `key.field`.
fn flatten_into(variables: &mut Variables, key: &str, value: &Value) {
    let Some(obj) = value.as_object() else {
        return;
    };
    for (field, v) in obj {
        let text = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        variables.insert(format!("{key}.{field}"), text);
    }
}

/// A creative product name with the reasoning behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductName {
    pub name: String,
    pub reasoning: String,
}

impl ProductName {
    pub fn schema() -> OutputSchema {
        OutputSchema::new(
            "product_name",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "A creative product name" },
                    "reasoning": {
                        "type": "string",
                        "description": "Brief explanation of why this name was chosen"
                    }
                },
                "required": ["name", "reasoning"],
                "additionalProperties": false
            }),
        )
    }
}

impl patternkit_core::schema::StructuredOutput for ProductName {
    fn output_schema() -> OutputSchema {
        Self::schema()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        Ok(())
    }
}

/// Name → slogan → description, starting from `{product_description}`.
///
/// Outputs: `product` (structured [`ProductName`]), `slogan`, `description`.
pub fn product_launch(invoker: ModelInvoker) -> PromptChain {
    PromptChain::new(invoker)
        .step(ChainStep::structured(
            "product",
            ChatTemplate::new(
                "Generate a creative product name for: {product_description}\n\
                 Provide the product name and explain why this name works well.",
            ),
            ProductName::schema(),
        ))
        .step(ChainStep::text(
            "slogan",
            ChatTemplate::new(
                "Create a catchy marketing slogan for a product called: {product.name}\n\
                 The slogan should be memorable and under 10 words.",
            ),
        ))
        .step(ChainStep::text(
            "description",
            ChatTemplate::new(
                "Write a 2-sentence product description for '{product.name}' with the slogan: '{slogan}'\n\
                 Make it compelling and highlight key benefits.",
            ),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use patternkit_core::error::{Error, ProviderError};
    use patternkit_core::template::PromptTemplate;
    use std::sync::Arc;

    fn water_bottle() -> Variables {
        Variables::from([(
            "product_description",
            "A water bottle that tracks your hydration and reminds you to drink water",
        )])
    }

    #[tokio::test]
    async fn product_launch_threads_outputs_forward() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            r#"{"name": "HydroPal", "reasoning": "Friendly and clear"}"#,
            "Sip smarter, live better.",
            "HydroPal keeps you hydrated. Sip smarter, live better.",
        ]));
        let chain = product_launch(ModelInvoker::new(provider.clone(), "mock-model"));

        let result = chain.run(water_bottle()).await.unwrap();

        assert_eq!(provider.call_count(), 3);
        assert!(provider.request(0).messages[0]
            .content
            .contains("tracks your hydration"));
        assert_eq!(
            provider.request(0).response_schema.map(|s| s.name).as_deref(),
            Some("product_name")
        );
        assert_eq!(
            provider.request(1).messages[0].content,
            "Create a catchy marketing slogan for a product called: HydroPal\n\
             The slogan should be memorable and under 10 words."
        );
        assert!(provider.request(2).messages[0]
            .content
            .contains("'HydroPal' with the slogan: 'Sip smarter, live better.'"));

        assert_eq!(result.variables.get("product.name"), Some("HydroPal"));
        assert_eq!(result.output("slogan").unwrap().text, "Sip smarter, live better.");
        assert_eq!(
            result.final_text(),
            Some("HydroPal keeps you hydrated. Sip smarter, live better.")
        );
        assert_eq!(
            result.output("product").unwrap().value.as_ref().unwrap()["reasoning"],
            "Friendly and clear"
        );
    }

    #[tokio::test]
    async fn failure_stops_later_steps() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
            "120s".into(),
        ))]));
        let chain = product_launch(ModelInvoker::new(provider.clone(), "mock-model"));

        let err = chain.run(water_bottle()).await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(ProviderError::Timeout(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn schema_violation_stops_chain() {
        let provider = Arc::new(ScriptedProvider::texts(&[r#"{"name": "HydroPal"}"#]));
        let chain = product_launch(ModelInvoker::new(provider.clone(), "mock-model"));

        let err = chain.run(water_bottle()).await.unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref schema, .. } if schema == "product_name"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_initial_variable_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::texts(&[]));
        let chain = product_launch(ModelInvoker::new(provider.clone(), "mock-model"));

        let err = chain.run(Variables::new()).await.unwrap_err();
        assert!(matches!(err, Error::MissingVariable { ref name } if name == "product_description"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn text_steps_see_previous_output() {
        let provider = Arc::new(ScriptedProvider::texts(&["  first  ", "second"]));
        let chain = PromptChain::new(ModelInvoker::new(provider.clone(), "mock-model"))
            .step(ChainStep::text("a", PromptTemplate::new("start {seed}")))
            .step(ChainStep::text("b", PromptTemplate::new("after {a}")));

        let result = chain.run(Variables::from([("seed", "x")])).await.unwrap();
        assert_eq!(provider.request(1).messages[0].content, "after first");
        assert_eq!(result.variables.get("b"), Some("second"));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn flatten_skips_nested_values() {
        let mut vars = Variables::new();
        flatten_into(
            &mut vars,
            "plan",
            &json!({"goal": "ship", "steps": [1, 2], "count": 2, "done": false}),
        );
        assert_eq!(vars.get("plan.goal"), Some("ship"));
        assert_eq!(vars.get("plan.count"), Some("2"));
        assert_eq!(vars.get("plan.done"), Some("false"));
        assert!(!vars.contains("plan.steps"));
    }
}
