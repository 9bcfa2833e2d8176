//! # patternkit Core
//!
//! Domain types, traits, and error definitions for the patternkit
//! orchestration runtime. This crate has **no transport dependencies**:
//! it defines the domain model that the provider, tool, and pattern crates
//! implement against.
//!
//! ## Layout
//!
//! - [`template`] — prompt templates with named placeholders
//! - [`schema`] — output schema descriptors and structured records
//! - [`provider`] — the text-generation service abstraction
//! - [`tool`] — locally executed tools and their registry
//! - [`event`] — domain events published while patterns run

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod schema;
pub mod template;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use schema::{OutputSchema, StructuredOutput, parse_structured};
pub use template::{ChatTemplate, PromptTemplate, Variables};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
