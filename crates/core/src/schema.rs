//! Output schemas — the boundary contract for structured model replies.
//!
//! An [`OutputSchema`] travels with a request (so the service can constrain
//! its reply) and is checked again when the reply comes back. The checker
//! covers the subset of JSON Schema the patterns actually use: `type`,
//! `properties`, `required`, `items` and `enum`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A named JSON-schema descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name (sent to the service, echoed in violations)
    pub name: String,

    /// The JSON Schema document
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Check a value against this schema.
    pub fn check(&self, value: &Value) -> Result<()> {
        check_node("$", &self.schema, value).map_err(|reason| Error::schema(&self.name, reason))
    }

    /// Parse raw model text as JSON and check it against this schema.
    pub fn parse_value(&self, raw: &str) -> Result<Value> {
        let body = strip_code_fence(raw);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::schema(&self.name, format!("invalid JSON: {e}")))?;
        self.check(&value)?;
        Ok(value)
    }
}

/// A record the model can be asked to produce.
///
/// `output_schema` describes the field set; `validate` adds semantic rules
/// that a JSON schema cannot express (ranges, cross-field constraints).
pub trait StructuredOutput: DeserializeOwned + Send + 'static {
    fn output_schema() -> OutputSchema;

    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Parse raw model text into a structured record.
///
/// Syntax errors, schema mismatches, deserialization failures and semantic
/// validation failures all become [`Error::SchemaViolation`].
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T> {
    let schema = T::output_schema();
    let value = schema.parse_value(raw)?;
    let record: T = serde_json::from_value(value).map_err(|e| Error::schema(&schema.name, e.to_string()))?;
    record
        .validate()
        .map_err(|reason| Error::schema(&schema.name, reason))?;
    Ok(record)
}

/// Strip a surrounding markdown code fence (```json ... ```), if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => strip_info_string(body.trim()),
    }
}

/// One-line fences put the payload right after the language tag.
fn strip_info_string(body: &str) -> &str {
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return body;
    }
    match body.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))) {
        Some(end) => body[end..].trim_start(),
        None => body,
    }
}

fn check_node(path: &str, schema: &Value, value: &Value) -> std::result::Result<(), String> {
    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(format!("{path}: {value} is not one of {}", Value::Array(allowed.clone())));
        }
    }

    let Some(expected) = schema.get("type").and_then(Value::as_str) else {
        return Ok(());
    };

    match expected {
        "object" => {
            let obj = value
                .as_object()
                .ok_or_else(|| format!("{path}: expected object, got {}", kind(value)))?;
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for field in required.iter().filter_map(Value::as_str) {
                    if !obj.contains_key(field) {
                        return Err(format!("{path}: missing required field '{field}'"));
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (field, sub) in props {
                    if let Some(v) = obj.get(field) {
                        // Optional fields may be null.
                        if v.is_null() && !is_required(schema, field) {
                            continue;
                        }
                        check_node(&format!("{path}.{field}"), sub, v)?;
                    }
                }
            }
            Ok(())
        }
        "array" => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("{path}: expected array, got {}", kind(value)))?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check_node(&format!("{path}[{i}]"), item_schema, item)?;
                }
            }
            Ok(())
        }
        "string" if value.is_string() => Ok(()),
        "integer" if value.is_i64() || value.is_u64() => Ok(()),
        "number" if value.is_number() => Ok(()),
        "boolean" if value.is_boolean() => Ok(()),
        "null" if value.is_null() => Ok(()),
        "string" | "integer" | "number" | "boolean" | "null" => {
            Err(format!("{path}: expected {expected}, got {}", kind(value)))
        }
        _ => Ok(()),
    }
}

fn is_required(schema: &Value, field: &str) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|req| req.iter().any(|r| r.as_str() == Some(field)))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
