//! `patternkit route` — Customer inquiry routing demo.

use patternkit_patterns::customer_support_router;

use super::{Context, banner};

const EXAMPLE_INQUIRIES: [&str; 4] = [
    "My app keeps crashing when I try to export data. I'm using version 2.3 on Windows.",
    "I was charged twice for my subscription this month. Can you help me get a refund?",
    "Does your product support integration with Slack and Microsoft Teams?",
    "I just wanted to say thank you for the excellent customer service last week!",
];

pub async fn run(ctx: &Context, inquiries: Vec<String>) -> anyhow::Result<()> {
    let inquiries = if inquiries.is_empty() {
        EXAMPLE_INQUIRIES.iter().map(|s| s.to_string()).collect()
    } else {
        inquiries
    };

    let mut router = customer_support_router(ctx.invoker.clone());
    if let Some(fallback) = &ctx.config.routing.fallback_category {
        router = router.with_fallback(fallback);
    }

    banner("ROUTING PATTERN DEMONSTRATION");
    println!();

    for (i, inquiry) in inquiries.iter().enumerate() {
        banner(&format!("EXAMPLE {}", i + 1));
        println!("Customer Inquiry:\n{inquiry}\n");

        let routed = router.run(inquiry).await?;

        println!("Routing Decision:");
        println!("  Category: {}", routed.decision.category);
        println!("  Confidence: {}", routed.decision.confidence);
        println!("  Reasoning: {}", routed.decision.reasoning);
        if routed.fell_back {
            println!("  Handled by fallback: {}", routed.handled_by);
        }
        println!("\nResponse:\n{}\n", routed.response);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    #[tokio::test]
    async fn routes_each_inquiry() {
        let provider = ScriptedProvider::texts(&[
            r#"{"category": "billing", "confidence": "high", "reasoning": "Refund"}"#,
            "We have refunded the duplicate charge.",
        ]);
        run(&context(provider.clone()), vec!["I was charged twice".into()])
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn unknown_label_needs_configured_fallback() {
        let decision = r#"{"category": "partnerships", "confidence": "low", "reasoning": "Unsure"}"#;

        let provider = ScriptedProvider::texts(&[decision]);
        let err = run(&context(provider), vec!["Partner with us?".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("partnerships"));

        let provider = ScriptedProvider::texts(&[decision, "Thanks for reaching out!"]);
        let mut ctx = context(provider.clone());
        ctx.config.routing.fallback_category = Some("general".into());
        run(&ctx, vec!["Partner with us?".into()]).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }
}
