//! patternkit CLI — the main entry point.
//!
//! Commands:
//! - `chain`       — Prompt chaining (name → slogan → description)
//! - `route`       — Classify customer inquiries and dispatch to a specialist
//! - `parallel`    — Fan out blog content prompts, sequential vs. concurrent
//! - `reflect`     — Producer/critic refinement of a blog post
//! - `tools`       — Tool use with a calculator and a weather lookup
//! - `plan`        — Break a goal into a dependency-ordered plan
//! - `collaborate` — Researcher, writer and editor agents in sequence

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use patternkit_config::AppConfig;
use patternkit_core::event::{DomainEvent, EventBus};
use patternkit_patterns::ModelInvoker;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "patternkit",
    about = "patternkit — agentic LLM design patterns, runnable from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.patternkit/config.toml)
    #[arg(short, long, global = true, env = "PATTERNKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a product name, slogan and description in sequence
    Chain {
        /// Product description to start from
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Route customer inquiries to specialised handlers
    Route {
        /// Inquiries to classify (the bundled examples when omitted)
        inquiries: Vec<String>,
    },

    /// Generate blog content with independent prompts run concurrently
    Parallel {
        /// Blog post topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Keep going when a branch fails and report every failure
        #[arg(long)]
        collect_all: bool,
    },

    /// Iteratively refine a blog post with a critic
    Reflect {
        /// Blog post topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Override the maximum number of producer/critic rounds
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Override the score (1-100) at which a draft is accepted
        #[arg(long)]
        target_score: Option<u8>,
    },

    /// Answer questions, calling local tools when needed
    Tools {
        /// Questions to answer (the bundled examples when omitted)
        queries: Vec<String>,
    },

    /// Turn a goal into a step-by-step plan
    Plan {
        /// The goal to plan for (the bundled examples when omitted)
        #[arg(short, long)]
        goal: Option<String>,

        /// Extra context for the planner
        #[arg(short = 'x', long)]
        context: Option<String>,
    },

    /// Research, write and edit a blog post with three agents
    Collaborate {
        /// Blog post topic
        #[arg(short, long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = match &cli.config {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .context("Failed to load config")?;

    // Fail before any pattern runs
    if let Err(e) = config.require_api_key() {
        print_key_help();
        return Err(e.into());
    }

    let provider = patternkit_providers::build_from_config(&config)?;
    let event_bus = Arc::new(EventBus::default());
    if cli.verbose {
        spawn_event_logger(&event_bus);
    }

    let invoker = ModelInvoker::new(provider, &config.model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_event_bus(event_bus);
    let ctx = commands::Context { config, invoker };

    match cli.command {
        Commands::Chain { description } => commands::chain::run(&ctx, description).await?,
        Commands::Route { inquiries } => commands::route::run(&ctx, inquiries).await?,
        Commands::Parallel { topic, collect_all } => {
            commands::parallel::run(&ctx, topic, collect_all).await?
        }
        Commands::Reflect {
            topic,
            max_rounds,
            target_score,
        } => commands::reflect::run(&ctx, topic, max_rounds, target_score).await?,
        Commands::Tools { queries } => commands::tools::run(&ctx, queries).await?,
        Commands::Plan { goal, context } => commands::plan::run(&ctx, goal, context).await?,
        Commands::Collaborate { topic } => commands::collaborate::run(&ctx, topic).await?,
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only pattern output.
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    PATTERNKIT_API_KEY=sk-...");
    eprintln!("    OPENAI_API_KEY=sk-...");
    eprintln!();
    eprintln!("  Or add `api_key` to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

/// Mirror domain events into the debug log.
fn spawn_event_logger(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event logger lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match event.as_ref() {
                DomainEvent::ResponseGenerated { model, tokens_used, .. } => {
                    tracing::debug!(%model, tokens_used, "event: response generated");
                }
                DomainEvent::ToolExecuted {
                    tool_name,
                    success,
                    duration_ms,
                    ..
                } => {
                    tracing::debug!(tool = %tool_name, success, duration_ms, "event: tool executed");
                }
                DomainEvent::RouteSelected { category, .. } => {
                    tracing::debug!(%category, "event: route selected");
                }
                DomainEvent::BranchCompleted {
                    branch,
                    success,
                    duration_ms,
                    ..
                } => {
                    tracing::debug!(%branch, success, duration_ms, "event: branch completed");
                }
                DomainEvent::ReflectionRound { round, score, .. } => {
                    tracing::debug!(round, score, "event: reflection round");
                }
            }
        }
    });
}
