//! `patternkit plan` — Goal decomposition demo.

use patternkit_patterns::Planner;
use patternkit_patterns::planning::EXAMPLE_GOALS;

use super::{Context, banner};

pub async fn run(ctx: &Context, goal: Option<String>, context: Option<String>) -> anyhow::Result<()> {
    let goals: Vec<(String, String)> = match goal {
        Some(goal) => vec![(goal, context.unwrap_or_default())],
        None => EXAMPLE_GOALS
            .iter()
            .map(|(g, c)| (g.to_string(), c.to_string()))
            .collect(),
    };

    let planner = Planner::new(ctx.invoker.clone());

    for (i, (goal, context)) in goals.iter().enumerate() {
        banner(&format!("EXAMPLE {}: Planning", i + 1));
        println!();
        let plan = planner.plan(goal, context).await?;
        println!("{}", plan.render());
    }

    Ok(())
}
