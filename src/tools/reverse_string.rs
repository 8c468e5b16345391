use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{single_string_schema, Tool};
use crate::error::{Result, SvarError};

/// Reverses text, for questions written backwards.
pub struct ReverseStringTool;

#[async_trait]
impl Tool for ReverseStringTool {
    fn name(&self) -> &str {
        "reverse_string"
    }

    fn description(&self) -> &str {
        "Reverses a given string. Use it when a question looks like it was written backwards."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("text", "The text to reverse"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        // Whitespace is significant here, so no trimming.
        match arguments.get("text") {
            Some(Value::String(text)) => Ok(text.chars().rev().collect()),
            Some(other) => Err(SvarError::InvalidInput(format!("Parameter 'text' must be a string, got {}", other))),
            None => Err(SvarError::InvalidInput("Missing required parameter: text".to_string())),
        }
    }
}
