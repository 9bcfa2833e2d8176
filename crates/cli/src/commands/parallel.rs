//! `patternkit parallel` — Sequential vs. concurrent fan-out demo.

use patternkit_core::template::Variables;
use patternkit_patterns::{FailurePolicy, FanOutResult, blog_content_fanout, speedup};

use super::{Context, banner, rule};

const DEFAULT_TOPIC: &str = "The future of AI in healthcare and medical diagnostics";

const SECTIONS: [(&str, &str); 4] = [
    ("title", "Title"),
    ("meta_description", "Meta Description"),
    ("social_post", "Social Post"),
    ("hashtags", "Hashtags"),
];

pub async fn run(ctx: &Context, topic: Option<String>, collect_all: bool) -> anyhow::Result<()> {
    let topic = topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let policy = if collect_all {
        FailurePolicy::CollectAll
    } else {
        ctx.config.parallel.failure_policy
    };

    banner("PARALLELIZATION PATTERN DEMONSTRATION");
    println!("\nTopic: {topic}\n");
    println!("Generating 4 pieces of content: title, meta description, social post, hashtags");
    println!("Comparing sequential vs. parallel execution...\n");

    let fanout = blog_content_fanout(ctx.invoker.clone()).with_policy(policy);
    let vars = Variables::from([("topic", topic.as_str())]);

    println!("[Sequential] Each task waits for the previous one to complete");
    let sequential = fanout.run_sequential(&vars).await?;
    print_results(&sequential, "Sequential");

    println!("\n[Parallel] All tasks run concurrently");
    let parallel = fanout.run(&vars).await?;
    print_results(&parallel, "Parallel");

    let seq_secs = sequential.elapsed.as_secs_f64();
    let par_secs = parallel.elapsed.as_secs_f64();
    println!();
    banner("PERFORMANCE COMPARISON");
    println!("Sequential Time:  {seq_secs:.2} seconds");
    println!("Parallel Time:    {par_secs:.2} seconds");
    println!(
        "\nSpeedup:          {:.2}x faster",
        speedup(sequential.elapsed, parallel.elapsed)
    );
    println!("Time Saved:       {:.2} seconds", seq_secs - par_secs);
    println!("{}", rule());

    Ok(())
}

fn print_results(result: &FanOutResult, label: &str) {
    println!("\n{} RESULTS:", label.to_uppercase());
    println!("{}", rule());
    for (i, (key, heading)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match result.get(key) {
            Some(text) => println!("{heading}: {text}"),
            None => println!("{heading}: (failed)"),
        }
    }
    for failure in &result.failures {
        println!("\n  ! {} failed: {}", failure.branch, failure.error);
    }
    println!("\nExecution Time: {:.2} seconds", result.elapsed.as_secs_f64());
    println!("{}", rule());
}
