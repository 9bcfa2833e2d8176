//! Parallel fan-out — independent prompts dispatched concurrently.
//!
//! Every branch is rendered from the same variable map before anything is
//! sent, so a missing variable fails the run without spending a model call.
//! Branch futures are polled together inside the calling task; results come
//! back in declaration order whatever order they finish in.

use std::time::Duration;

use futures::TryFutureExt;
use futures::future::{join_all, try_join_all};
use patternkit_config::FailurePolicy;
use patternkit_core::error::{Error, Result};
use patternkit_core::event::DomainEvent;
use patternkit_core::message::Message;
use patternkit_core::template::{ChatTemplate, Variables};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::invoker::ModelInvoker;

/// A named, independent prompt.
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    pub template: ChatTemplate,
}

#[derive(Debug, Clone)]
pub struct BranchOutput {
    pub name: String,
    pub text: String,
    pub elapsed: Duration,
}

/// A branch that failed under [`FailurePolicy::CollectAll`].
#[derive(Debug)]
pub struct BranchFailure {
    pub branch: String,
    pub error: Error,
}

#[derive(Debug)]
pub struct FanOutResult {
    /// Successful branches, in declaration order
    pub outputs: Vec<BranchOutput>,
    /// Failed branches, in declaration order (always empty under fail-fast)
    pub failures: Vec<BranchFailure>,
    /// Wall-clock time for the whole fan-out
    pub elapsed: Duration,
}

impl FanOutResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.text.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How many times faster `parallel` was than `sequential`.
pub fn speedup(sequential: Duration, parallel: Duration) -> f64 {
    if parallel.is_zero() {
        return 0.0;
    }
    sequential.as_secs_f64() / parallel.as_secs_f64()
}

pub struct FanOut {
    invoker: ModelInvoker,
    branches: Vec<Branch>,
    policy: FailurePolicy,
}

impl FanOut {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker,
            branches: Vec::new(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn branch(mut self, name: impl Into<String>, template: impl Into<ChatTemplate>) -> Self {
        self.branches.push(Branch {
            name: name.into(),
            template: template.into(),
        });
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Dispatch every branch concurrently and wait for all of them.
    ///
    /// Under fail-fast the first failure drops the outstanding branches and
    /// is returned as [`Error::BranchFailed`].
    pub async fn run(&self, vars: &Variables) -> Result<FanOutResult> {
        let rendered = self.render_all(vars)?;
        info!(
            branches = rendered.len(),
            policy = ?self.policy,
            "Running parallel fan-out"
        );
        let start = Instant::now();

        let (outputs, failures) = match self.policy {
            FailurePolicy::FailFast => {
                let branches = rendered.into_iter().map(|(branch, messages)| {
                    self.run_branch(branch, messages).map_err(BranchFailure::into_error)
                });
                (try_join_all(branches).await?, Vec::new())
            }
            FailurePolicy::CollectAll => {
                let branches = rendered
                    .into_iter()
                    .map(|(branch, messages)| self.run_branch(branch, messages));
                split(join_all(branches).await)
            }
        };

        let elapsed = start.elapsed();
        info!(
            succeeded = outputs.len(),
            failed = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fan-out complete"
        );
        Ok(FanOutResult {
            outputs,
            failures,
            elapsed,
        })
    }

    /// Run the same branches one after another, for comparison with [`run`](Self::run).
    pub async fn run_sequential(&self, vars: &Variables) -> Result<FanOutResult> {
        let rendered = self.render_all(vars)?;
        info!(branches = rendered.len(), "Running branches sequentially");
        let start = Instant::now();

        let mut results = Vec::with_capacity(rendered.len());
        for (branch, messages) in rendered {
            let result = self.run_branch(branch, messages).await;
            if self.policy == FailurePolicy::FailFast {
                results.push(Ok(result.map_err(BranchFailure::into_error)?));
            } else {
                results.push(result);
            }
        }
        let (outputs, failures) = split(results);

        Ok(FanOutResult {
            outputs,
            failures,
            elapsed: start.elapsed(),
        })
    }

    fn render_all(&self, vars: &Variables) -> Result<Vec<(&Branch, Vec<Message>)>> {
        self.branches
            .iter()
            .map(|branch| Ok((branch, branch.template.render(vars)?)))
            .collect()
    }

    async fn run_branch(
        &self,
        branch: &Branch,
        messages: Vec<Message>,
    ) -> std::result::Result<BranchOutput, BranchFailure> {
        let start = Instant::now();
        debug!(branch = %branch.name, "Branch started");
        let result = self.invoker.invoke_messages_text(messages).await;
        let elapsed = start.elapsed();

        self.invoker.event_bus().publish(DomainEvent::BranchCompleted {
            branch: branch.name.clone(),
            success: result.is_ok(),
            duration_ms: elapsed.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        match result {
            Ok(text) => {
                debug!(branch = %branch.name, elapsed_ms = elapsed.as_millis() as u64, "Branch finished");
                Ok(BranchOutput {
                    name: branch.name.clone(),
                    text: text.trim().to_string(),
                    elapsed,
                })
            }
            Err(error) => {
                warn!(branch = %branch.name, error = %error, "Branch failed");
                Err(BranchFailure {
                    branch: branch.name.clone(),
                    error,
                })
            }
        }
    }
}

impl BranchFailure {
    fn into_error(self) -> Error {
        Error::BranchFailed {
            branch: self.branch,
            source: Box::new(self.error),
        }
    }
}

fn split(
    results: Vec<std::result::Result<BranchOutput, BranchFailure>>,
) -> (Vec<BranchOutput>, Vec<BranchFailure>) {
    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(failure) => failures.push(failure),
        }
    }
    (outputs, failures)
}

/// Title, meta description, social post and hashtags for a blog `{topic}`.
pub fn blog_content_fanout(invoker: ModelInvoker) -> FanOut {
    FanOut::new(invoker)
        .branch(
            "title",
            ChatTemplate::new(
                "Create a catchy, SEO-friendly blog post title about: {topic}\n\
                 The title should be engaging and under 60 characters.",
            ),
        )
        .branch(
            "meta_description",
            ChatTemplate::new(
                "Write a compelling meta description for a blog post about: {topic}\n\
                 Keep it under 155 characters and include a call-to-action.",
            ),
        )
        .branch(
            "social_post",
            ChatTemplate::new(
                "Create an engaging social media post (Twitter/X style) about: {topic}\n\
                 Keep it under 280 characters and make it shareable.",
            ),
        )
        .branch(
            "hashtags",
            ChatTemplate::new(
                "Generate 5 relevant and trending hashtags for a blog post about: {topic}\n\
                 Format as a comma-separated list.",
            ),
        )
}
