//! Text-generation provider implementations for patternkit.
//!
//! All providers implement the `patternkit_core::Provider` trait.
//! [`build_from_config`] selects and configures one from `AppConfig`.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_from_config, default_base_url};
pub use openai_compat::{HttpSettings, OpenAiCompatProvider};
