//! `patternkit reflect` — Producer/critic refinement demo.

use patternkit_patterns::{ReflectionLoop, ReflectionOutcome};

use super::{Context, banner};

const DEFAULT_TOPIC: &str = "How AI is transforming personalized learning in education";

pub async fn run(
    ctx: &Context,
    topic: Option<String>,
    max_rounds: Option<usize>,
    target_score: Option<u8>,
) -> anyhow::Result<()> {
    let topic = topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let settings = &ctx.config.reflection;
    let max_rounds = max_rounds.unwrap_or(settings.max_rounds);
    let target_score = target_score.unwrap_or(settings.target_score);

    banner("REFLECTION PATTERN DEMONSTRATION");
    println!("\nTopic: {topic}");
    println!("Target Quality Score: {target_score}/100");
    println!("Maximum Iterations: {max_rounds}\n");

    let result = ReflectionLoop::with_model(ctx.invoker.clone())
        .with_max_rounds(max_rounds)
        .with_target_score(target_score)
        .with_episodic_capacity(settings.episodic_capacity)
        .run(&topic)
        .await?;

    for record in &result.history {
        banner(&format!("ITERATION {}", record.round));
        println!("\n--- DRAFT {} ---\n{}\n", record.round, record.draft);

        let critique = &record.critique;
        println!("--- EDITORIAL FEEDBACK ---");
        println!("Overall Assessment: {}", critique.overall_assessment);
        println!("\nQuality Score: {}/100", critique.quality_score);
        println!("\nStrengths:");
        for strength in &critique.strengths {
            println!("  + {strength}");
        }
        if !critique.issues.is_empty() {
            println!("\nIssues to Address:");
            for issue in &critique.issues {
                println!("  - {issue}");
            }
        }
        println!();
    }

    match result.outcome {
        ReflectionOutcome::TargetReached => banner("SUCCESS: Blog post meets quality standards!"),
        ReflectionOutcome::RoundLimit => banner("Maximum iterations reached."),
    }
    println!("Total Iterations: {}", result.rounds);
    println!(
        "Final Quality Score: {}/100 (Target: {target_score}+)",
        result.final_score
    );
    if !result.memory.notes().is_empty() {
        println!("\nLessons recorded:");
        for note in result.memory.notes() {
            println!("  - {note}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    const PASSING: &str =
        r#"{"overall_assessment": "Ready", "strengths": ["Clear"], "issues": [], "quality_score": 90}"#;

    #[tokio::test]
    async fn stops_when_target_is_met() {
        let provider = ScriptedProvider::texts(&["draft", PASSING]);
        run(&context(provider.clone()), Some("Topic".into()), Some(3), Some(80))
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn rejects_out_of_range_target() {
        let provider = ScriptedProvider::texts(&["draft", PASSING]);
        let err = run(&context(provider.clone()), None, None, Some(0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 100"));
        assert_eq!(provider.call_count(), 0);
    }
}
