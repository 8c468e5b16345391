//! Flattens a conversation and tool catalog into a single completion prompt.

use serde_json::{Map, Value};

use super::{ARGS_PREFIX, NAME_PREFIX, TOOL_CALL_CLOSE, TOOL_CALL_OPEN, TOOL_RESULT_CLOSE, TOOL_RESULT_OPEN};
use crate::config::ToolPrompts;
use crate::conversation::{Conversation, Invocation, Role, Turn};
use crate::tools::ToolDescriptor;

/// Renders prompts for endpoints that only understand plain text.
///
/// Output is a pure function of its inputs: the same conversation and
/// catalog always produce byte-identical prompts.
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    catalog_intro: String,
    catalog_outro: String,
}

impl Default for PromptFormatter {
    fn default() -> Self {
        Self::from_prompts(&ToolPrompts::default())
    }
}

impl PromptFormatter {
    pub fn new(catalog_intro: impl Into<String>, catalog_outro: impl Into<String>) -> Self {
        Self {
            catalog_intro: catalog_intro.into(),
            catalog_outro: catalog_outro.into(),
        }
    }

    pub fn from_prompts(prompts: &ToolPrompts) -> Self {
        Self::new(prompts.catalog_intro.clone(), prompts.catalog_outro.clone())
    }

    /// Build the prompt: system text, tool catalog, then the transcript ending
    /// in a bare `Assistant:` cue. Segments are separated by a blank line.
    pub fn format(&self, conversation: &Conversation, tools: &[ToolDescriptor]) -> String {
        let mut segments = Vec::with_capacity(3);

        if let Some(system) = conversation.system_prompt() {
            segments.push(system.trim().to_string());
        }

        if !tools.is_empty() {
            segments.push(self.render_catalog(tools));
        }

        segments.push(render_transcript(conversation.turns()));

        segments.join("\n\n")
    }

    fn render_catalog(&self, tools: &[ToolDescriptor]) -> String {
        let mut parts = Vec::with_capacity(tools.len() + 2);
        parts.push(self.catalog_intro.trim().to_string());

        for tool in tools {
            let example = Invocation::new("", tool.name.clone(), example_arguments(tool.schema.as_ref()));
            parts.push(format!(
                "Tool: {}\nDescription: {}\nUsage:\n{}",
                tool.name,
                tool.description.trim(),
                render_tool_call(&example)
            ));
        }

        if !self.catalog_outro.trim().is_empty() {
            parts.push(self.catalog_outro.trim().to_string());
        }

        parts.join("\n\n")
    }
}

/// Render one invocation as a literal `<tool_call>` block.
pub fn render_tool_call(invocation: &Invocation) -> String {
    // serde_json's Map is ordered by key, so the rendering is stable.
    let args = serde_json::to_string(&invocation.arguments)
        .map(|json| escape_markers(&json))
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}\n{}{}\n{}{}\n{}",
        TOOL_CALL_OPEN, NAME_PREFIX, invocation.name, ARGS_PREFIX, args, TOOL_CALL_CLOSE
    )
}

/// Marker text can only appear inside JSON strings here, where `\u003c` is a
/// valid escape for `<`. Without it an argument could end the block early.
fn escape_markers(json: &str) -> String {
    json.replace(TOOL_CALL_CLOSE, &TOOL_CALL_CLOSE.replacen('<', "\\u003c", 1))
        .replace(TOOL_CALL_OPEN, &TOOL_CALL_OPEN.replacen('<', "\\u003c", 1))
}

fn render_transcript(turns: &[Turn]) -> String {
    let mut lines: Vec<String> = turns
        .iter()
        .filter_map(|turn| match turn.role {
            Role::System => None,
            Role::User => Some(format!("User: {}", turn.text)),
            Role::Assistant if turn.has_invocations() => {
                let blocks: Vec<String> = turn.invocations.iter().map(render_tool_call).collect();
                Some(format!("Assistant: {}", blocks.join("\n")))
            }
            Role::Assistant => Some(format!("Assistant: {}", turn.text)),
            Role::Tool => Some(format!(
                "User: {}\n{}\n{}",
                TOOL_RESULT_OPEN, turn.text, TOOL_RESULT_CLOSE
            )),
        })
        .collect();

    lines.push("Assistant:".to_string());
    lines.join("\n")
}

/// Placeholder arguments derived from a JSON schema's `properties`.
fn example_arguments(schema: Option<&Value>) -> Map<String, Value> {
    let Some(properties) = schema
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
    else {
        return Map::new();
    };

    properties
        .iter()
        .map(|(name, property)| {
            let kind = property.get("type").and_then(Value::as_str).unwrap_or("value");
            (name.clone(), Value::String(format!("<{}>", kind)))
        })
        .collect()
}
