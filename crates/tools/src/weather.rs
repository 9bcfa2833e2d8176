//! Weather tool — returns canned conditions for a handful of cities.
//!
//! The data is static so tool-use runs are reproducible without a weather
//! API key.

use async_trait::async_trait;
use patternkit_core::error::ToolError;
use patternkit_core::tool::{Tool, ToolResult};

/// Known cities (lowercase) and their conditions.
const WEATHER: &[(&str, &str)] = &[
    ("london", "Cloudy with occasional rain, 15°C (59°F)"),
    ("paris", "Partly sunny, 18°C (64°F)"),
    ("tokyo", "Clear skies, 22°C (72°F)"),
    ("new york", "Sunny, 20°C (68°F)"),
    ("san francisco", "Foggy morning clearing to sun, 16°C (61°F)"),
    ("sydney", "Warm and sunny, 25°C (77°F)"),
];

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Retrieves current weather information for a given city. Use this tool when you need to check the weather in a specific location."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The name of the city to get weather for"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        Ok(lookup(city))
    }
}

/// Look up a city, case-insensitively.
pub fn lookup(city: &str) -> ToolResult {
    let key = city.trim().to_lowercase();
    match WEATHER.iter().find(|(name, _)| *name == key) {
        Some((name, conditions)) => ToolResult {
            success: true,
            output: format!("Weather in {}: {conditions}", title_case(name)),
            data: Some(serde_json::json!({ "city": title_case(name), "conditions": conditions })),
        },
        None => {
            let available: Vec<String> = WEATHER.iter().map(|(name, _)| title_case(name)).collect();
            ToolResult {
                success: false,
                output: format!(
                    "Weather data for {city} is not available. Available cities: {}",
                    available.join(", ")
                ),
                data: None,
            }
        }
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
