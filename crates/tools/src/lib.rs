//! Built-in tool implementations for patternkit.
//!
//! Tools are deterministic local functions the tool-use pattern can run
//! when the model asks for them.

pub mod calculator;
pub mod weather;

use patternkit_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use weather::WeatherTool;

/// Create a tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalculatorTool));
    registry.register(Box::new(WeatherTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtin_tools() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["calculator", "get_weather"]);
    }
}
