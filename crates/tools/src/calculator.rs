//! Calculator tool — one binary arithmetic operation per call.
//!
//! The model picks the operation and both operands; the tool answers with
//! a sentence the model can quote back.

use async_trait::async_trait;
use patternkit_core::error::ToolError;
use patternkit_core::tool::{Tool, ToolResult};

pub struct CalculatorTool;

/// Supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    /// Apply the operation. `None` means division by zero.
    pub fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            Self::Add => Some(a + b),
            Self::Subtract => Some(a - b),
            Self::Multiply => Some(a * b),
            Self::Divide if b == 0.0 => None,
            Self::Divide => Some(a / b),
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Performs basic mathematical calculations. Use this tool when you need to perform arithmetic operations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The mathematical operation to perform"
                },
                "a": { "type": "number", "description": "The first number" },
                "b": { "type": "number", "description": "The second number" }
            },
            "required": ["operation", "a", "b"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = arguments["operation"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'operation' argument".into()))?;
        let op = Operation::parse(name)
            .ok_or_else(|| ToolError::InvalidArguments(format!("Unknown operation '{name}'")))?;
        let a = number(&arguments, "a")?;
        let b = number(&arguments, "b")?;

        match op.apply(a, b) {
            Some(value) => Ok(ToolResult {
                success: true,
                output: format!(
                    "The result of {} {} {} is: {}",
                    format_number(a),
                    op.as_str(),
                    format_number(b),
                    format_number(value)
                ),
                data: Some(serde_json::json!({ "result": value })),
            }),
            None => Ok(ToolResult {
                success: false,
                output: "Error: Division by zero".into(),
                data: None,
            }),
        }
    }
}

fn number(arguments: &serde_json::Value, key: &str) -> Result<f64, ToolError> {
    arguments[key]
        .as_f64()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing or non-numeric '{key}' argument")))
}

/// Drop a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn multiplies() {
        let result = CalculatorTool
            .execute(json!({"operation": "multiply", "a": 1234, "b": 56}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "The result of 1234 multiply 56 is: 69104");
    }

    #[tokio::test]
    async fn subtracts_to_negative() {
        let result = CalculatorTool
            .execute(json!({"operation": "subtract", "a": 15, "b": 22}))
            .await
            .unwrap();
        assert_eq!(result.output, "The result of 15 subtract 22 is: -7");
    }

    #[tokio::test]
    async fn divides_with_decimals() {
        let result = CalculatorTool
            .execute(json!({"operation": "divide", "a": 10, "b": 4}))
            .await
            .unwrap();
        assert_eq!(result.output, "The result of 10 divide 4 is: 2.5");
    }

    #[tokio::test]
    async fn division_by_zero_is_reported_not_raised() {
        let result = CalculatorTool
            .execute(json!({"operation": "divide", "a": 1, "b": 0}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "Error: Division by zero");
    }

    #[tokio::test]
    async fn unknown_operation_is_invalid() {
        let err = CalculatorTool
            .execute(json!({"operation": "modulo", "a": 1, "b": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref m) if m.contains("modulo")));
    }

    #[tokio::test]
    async fn missing_operand_is_invalid() {
        let err = CalculatorTool
            .execute(json!({"operation": "add", "a": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn tool_definition() {
        let def = CalculatorTool.to_definition();
        assert_eq!(def.name, "calculator");
        assert_eq!(def.parameters["required"], json!(["operation", "a", "b"]));
    }
}
