//! # patternkit Patterns
//!
//! Agentic design patterns built on a shared [`ModelInvoker`]:
//!
//! - [`chain`] — sequential prompt chaining
//! - [`routing`] — classify, then dispatch to one handler
//! - [`parallel`] — concurrent fan-out with a failure policy
//! - [`reflection`] — producer/critic refinement with episodic memory
//! - [`tool_use`] — the tool-dispatch state machine
//! - [`planning`] — goal decomposition into a validated plan
//! - [`collaboration`] — researcher, writer and editor roles
//!
//! Every pattern is cancel-safe: dropping its future stops any in-flight
//! model calls and leaves no background work behind.

pub mod chain;
pub mod collaboration;
pub mod invoker;
pub mod memory;
pub mod parallel;
pub mod planning;
pub mod reflection;
pub mod routing;
pub mod tool_use;

#[cfg(test)]
mod test_helpers;

pub use chain::{ChainResult, ChainStep, PromptChain, StepOutput, product_launch};
pub use collaboration::{CollaborationResult, ContentTeam, ResearchNotes};
pub use invoker::{ModelInvoker, ModelOutput};
pub use memory::{Episode, EpisodicMemory};
pub use parallel::{BranchFailure, BranchOutput, FanOut, FanOutResult, blog_content_fanout, speedup};
pub use patternkit_config::FailurePolicy;
pub use planning::{Plan, PlanStep, Planner};
pub use reflection::{
    Critic, Critique, DraftRequest, ModelCritic, ModelProducer, Producer, ReflectionLoop,
    ReflectionOutcome, ReflectionResult,
};
pub use routing::{
    Classifier, Confidence, ModelClassifier, PromptHandler, RouteCategory, RouteDecision,
    RouteHandler, RoutedResponse, Router, customer_support_router,
};
pub use tool_use::{DispatchResult, DispatchState, StopReason, ToolDispatcher, ToolInvocation};
