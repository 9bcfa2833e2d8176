//! `patternkit chain` — Prompt chaining demo.

use patternkit_core::template::Variables;
use patternkit_patterns::product_launch;

use super::{Context, banner};

const DEFAULT_DESCRIPTION: &str =
    "A water bottle that tracks your hydration and reminds you to drink water";

pub async fn run(ctx: &Context, description: Option<String>) -> anyhow::Result<()> {
    let description = description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    banner("PROMPT CHAINING: Product Launch");
    println!("Starting with: {description}\n");

    let chain = product_launch(ctx.invoker.clone());
    let result = chain
        .run(Variables::from([("product_description", description.as_str())]))
        .await?;

    let var = |key: &str| result.variables.get(key).unwrap_or_default().to_string();
    println!("Step 1: Product Name: {}", var("product.name"));
    println!("        Reasoning: {}\n", var("product.reasoning"));
    println!("Step 2: Slogan: {}\n", var("slogan"));
    println!("Step 3: Description: {}\n", var("description"));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    #[tokio::test]
    async fn runs_all_three_steps() {
        let provider = ScriptedProvider::texts(&[
            r#"{"name": "AquaMind", "reasoning": "Memorable"}"#,
            "Hydration, remembered.",
            "AquaMind tracks every sip.",
        ]);
        run(&context(provider.clone()), Some("A smart bottle".into()))
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn bad_product_name_stops_the_chain() {
        let provider = ScriptedProvider::texts(&["not json", "unused"]);
        let err = run(&context(provider.clone()), None).await.unwrap_err();
        assert!(err.to_string().contains("product_name"));
        assert_eq!(provider.call_count(), 1);
    }
}
