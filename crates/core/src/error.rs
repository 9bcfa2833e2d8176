//! Error types for the patternkit domain.
//!
//! Uses `thiserror` for error definitions. Every variant propagates to the
//! caller; nothing is recovered automatically.

use thiserror::Error;

/// The top-level error type for all patternkit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Prompt assembly ---
    #[error("Missing template variable: {name}")]
    MissingVariable { name: String },

    #[error("Malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: String },

    // --- Model invocation ---
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(#[from] ProviderError),

    #[error("Output does not match schema '{schema}': {reason}")]
    SchemaViolation { schema: String, reason: String },

    // --- Tool dispatch ---
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool error: {0}")]
    Tool(ToolError),

    // --- Fan-out ---
    #[error("Branch '{branch}' failed: {source}")]
    BranchFailed {
        branch: String,
        #[source]
        source: Box<Error>,
    },

    // --- Routing ---
    #[error("Unrecognized route label: {label}")]
    UnrecognizedRoute { label: String },

    // --- Configuration ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a schema violation.
    pub fn schema(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            schema: schema.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => Error::UnknownTool(name),
            other => Error::Tool(other),
        }
    }
}
