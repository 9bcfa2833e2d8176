//! `patternkit collaborate` — Researcher → writer → editor demo.

use patternkit_patterns::ContentTeam;

use super::{Context, banner};

const DEFAULT_TOPIC: &str = "The benefits and challenges of using LangChain for building AI agents";

pub async fn run(ctx: &Context, topic: Option<String>) -> anyhow::Result<()> {
    let topic = topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let team = ContentTeam::new(ctx.invoker.clone());
    let dashes = "-".repeat(80);

    banner("MULTI-AGENT COLLABORATION");
    println!("Topic: {topic}\n");

    banner("STEP 1: Research Phase");
    let notes = team.research(&topic).await?;
    println!("Topic: {}", notes.topic);
    println!("\nKey Points:");
    for (i, point) in notes.key_points.iter().enumerate() {
        println!("  {}. {point}", i + 1);
    }
    println!("\nSummary: {}", notes.summary);
    println!("\nSources Referenced: {}\n", notes.sources.join(", "));

    banner("STEP 2: Writing Phase");
    let draft = team.write(&notes).await?;
    println!("Draft Blog Post:\n{dashes}\n{draft}\n{dashes}\n");

    banner("STEP 3: Editing Phase");
    let final_post = team.edit(&draft).await?;
    println!("Final Polished Blog Post:\n{dashes}\n{final_post}\n{dashes}\n");

    banner("WORKFLOW COMPLETE");
    Ok(())
}
