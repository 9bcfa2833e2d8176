//! Configuration loading and validation for patternkit.
//!
//! Loads configuration from `~/.patternkit/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings before
//! any pattern runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.patternkit/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the text-generation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name (only "openai"-compatible services are supported)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL override (defaults to the provider's public endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for generative calls
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per response (service default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip TLS certificate verification (TLS-inspecting corporate proxies)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default)]
    pub tool_use: ToolUseConfig,

    #[serde(default)]
    pub reflection: ReflectionConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("tool_use", &self.tool_use)
            .field("reflection", &self.reflection)
            .field("parallel", &self.parallel)
            .field("routing", &self.routing)
            .finish()
    }
}

/// Tool-use loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUseConfig {
    /// Model turns that may request tools before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Temperature for tool-selection calls
    #[serde(default)]
    pub temperature: f32,
}

fn default_max_iterations() -> usize {
    5
}

impl Default for ToolUseConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: 0.0,
        }
    }
}

/// Reflection loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Critic score (1-100) at which the draft is accepted
    #[serde(default = "default_target_score")]
    pub target_score: u8,

    /// Recent episodes kept in working memory
    #[serde(default = "default_episodic_capacity")]
    pub episodic_capacity: usize,
}

fn default_max_rounds() -> usize {
    10
}
fn default_target_score() -> u8 {
    80
}
fn default_episodic_capacity() -> usize {
    3
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            target_score: default_target_score(),
            episodic_capacity: default_episodic_capacity(),
        }
    }
}

/// What a fan-out does when one branch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Cancel the remaining branches and return the first error
    #[default]
    FailFast,
    /// Wait for every branch and report all failures
    CollectAll,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Category whose handler runs when the classifier emits an unknown label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_category: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.patternkit/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides:
    /// - `PATTERNKIT_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `PATTERNKIT_PROVIDER`, `PATTERNKIT_MODEL`, `PATTERNKIT_API_URL`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("PATTERNKIT_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));
        }
        if let Some(provider) = non_empty("PATTERNKIT_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = non_empty("PATTERNKIT_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty("PATTERNKIT_API_URL") {
            self.api_url = Some(url);
        }
    }

    /// Load configuration from a specific file path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".patternkit")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.tool_use.temperature) {
            return Err(ConfigError::ValidationError(
                "tool_use.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.tool_use.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "tool_use.max_iterations must be at least 1".into(),
            ));
        }
        if self.reflection.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "reflection.max_rounds must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.reflection.target_score) {
            return Err(ConfigError::ValidationError(
                "reflection.target_score must be between 1 and 100".into(),
            ));
        }
        if self.reflection.episodic_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "reflection.episodic_capacity must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The API key, or the fatal configuration error if none is set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            request_timeout_secs: default_request_timeout_secs(),
            accept_invalid_certs: false,
            tool_use: ToolUseConfig::default(),
            reflection: ReflectionConfig::default(),
            parallel: ParallelConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured (set PATTERNKIT_API_KEY or OPENAI_API_KEY, or api_key in config.toml)")]
    MissingApiKey,
}

impl From<ConfigError> for patternkit_core::Error {
    fn from(e: ConfigError) -> Self {
        patternkit_core::Error::Config {
            message: e.to_string(),
        }
    }
}
