//! `patternkit tools` — Tool use demo with a calculator and weather lookup.

use std::sync::Arc;

use patternkit_patterns::{StopReason, ToolDispatcher};

use super::{Context, banner};

const EXAMPLE_QUERIES: [(&str, &str); 4] = [
    ("Mathematical Calculation", "What is 1,234 multiplied by 56?"),
    ("Weather Lookup", "What's the weather like in Tokyo?"),
    ("No Tool Required", "What is the capital of France?"),
    (
        "Multiple Tool Usage",
        "If it's 22°C in Tokyo and 15°C in London, what's the temperature difference in Celsius?",
    ),
];

pub async fn run(ctx: &Context, queries: Vec<String>) -> anyhow::Result<()> {
    let queries: Vec<(String, String)> = if queries.is_empty() {
        EXAMPLE_QUERIES
            .iter()
            .map(|(title, q)| (title.to_string(), q.to_string()))
            .collect()
    } else {
        queries
            .into_iter()
            .enumerate()
            .map(|(i, q)| (format!("Query {}", i + 1), q))
            .collect()
    };

    let settings = &ctx.config.tool_use;
    let invoker = ctx.invoker.clone().with_temperature(settings.temperature);
    let dispatcher = ToolDispatcher::new(invoker, Arc::new(patternkit_tools::default_registry()))
        .with_max_iterations(settings.max_iterations);

    for (i, (title, query)) in queries.iter().enumerate() {
        banner(&format!("EXAMPLE {}: {title}", i + 1));
        println!("User Query: {query}\n");

        let result = dispatcher.run(query).await?;

        for invocation in &result.invocations {
            println!("Tool: {}", invocation.tool_name);
            println!("Arguments: {}", invocation.arguments);
            println!("Tool Output: {}\n", invocation.output);
        }
        if result.invocations.is_empty() {
            println!("(no tools used)\n");
        }

        println!("Final Answer: {}", result.answer);
        if result.stop_reason == StopReason::IterationLimit {
            println!("(stopped after {} tool rounds)", result.iterations);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use patternkit_core::message::Message;

    #[tokio::test]
    async fn calculator_query() {
        let provider = ScriptedProvider::new(vec![
            tool_request(
                "calculator",
                serde_json::json!({"operation": "multiply", "a": 1234, "b": 56}),
            ),
            reply(Message::assistant("69,104")),
        ]);
        run(&context(provider.clone()), vec!["What is 1,234 multiplied by 56?".into()])
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let provider = ScriptedProvider::new(vec![tool_request("send_email", serde_json::json!({}))]);
        let err = run(&context(provider), vec!["Email my boss".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("send_email"));
    }
}
