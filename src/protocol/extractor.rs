//! Extracts `<tool_call>` blocks from generated text.

use tracing::{debug, warn};

use super::literal::parse_mapping;
use super::{ARGS_PREFIX, NAME_PREFIX, TOOL_CALL_CLOSE, TOOL_CALL_OPEN};
use crate::conversation::{Invocation, Turn};

/// Classification of one model generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// No usable invocation blocks; the raw text is the answer.
    FinalAnswer(String),
    /// At least one block parsed. `text` is the untouched raw generation.
    Invocations {
        text: String,
        invocations: Vec<Invocation>,
    },
}

impl Extraction {
    pub fn text(&self) -> &str {
        match self {
            Extraction::FinalAnswer(text) => text,
            Extraction::Invocations { text, .. } => text,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Extraction::FinalAnswer(_))
    }

    /// The assistant turn this generation becomes in the conversation.
    pub fn into_turn(self) -> Turn {
        match self {
            Extraction::FinalAnswer(text) => Turn::assistant(text),
            Extraction::Invocations { text, invocations } => Turn::assistant_with_invocations(text, invocations),
        }
    }
}

/// Stateless scanner that turns raw generations into [`Extraction`]s.
///
/// Call ids are `<prefix>_<index>` with a sequential index per generation.
#[derive(Debug, Clone)]
pub struct ToolCallExtractor {
    id_prefix: String,
}

impl Default for ToolCallExtractor {
    fn default() -> Self {
        Self::with_prefix("call")
    }
}

impl ToolCallExtractor {
    pub fn with_prefix(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
        }
    }

    pub fn extract(&self, raw: &str) -> Extraction {
        let mut invocations = Vec::new();

        for (offset, body) in find_blocks(raw) {
            match parse_block(body) {
                Ok((name, arguments)) => {
                    let id = format!("{}_{}", self.id_prefix, invocations.len());
                    invocations.push(Invocation::new(id, name, arguments));
                }
                Err(reason) => {
                    warn!(offset, "Dropping malformed tool call block: {}", reason);
                }
            }
        }

        if invocations.is_empty() {
            Extraction::FinalAnswer(raw.to_string())
        } else {
            debug!("Extracted {} tool call(s)", invocations.len());
            Extraction::Invocations {
                text: raw.to_string(),
                invocations,
            }
        }
    }
}

/// Extract with the default `call` id prefix.
pub fn extract_tool_calls(raw: &str) -> Extraction {
    ToolCallExtractor::default().extract(raw)
}

/// Find the bodies of all properly closed, non-overlapping blocks.
///
/// An open marker with no close marker, or with another open marker before
/// its close, is skipped and scanning resumes after it.
fn find_blocks(raw: &str) -> Vec<(usize, &str)> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = raw[cursor..].find(TOOL_CALL_OPEN) {
        let open = cursor + found;
        let body_start = open + TOOL_CALL_OPEN.len();
        let rest = &raw[body_start..];

        let close = rest.find(TOOL_CALL_CLOSE);
        let next_open = rest.find(TOOL_CALL_OPEN);

        match (close, next_open) {
            (Some(close), Some(next)) if next < close => {
                warn!(offset = open, "Tool call block opened again before closing; skipping it");
                cursor = body_start;
            }
            (Some(close), _) => {
                blocks.push((open, &rest[..close]));
                cursor = body_start + close + TOOL_CALL_CLOSE.len();
            }
            (None, _) => {
                warn!(offset = open, "Tool call block is missing its closing marker; skipping it");
                cursor = body_start;
            }
        }
    }

    blocks
}

/// Parse `name=...` and `args=...` out of one block body.
fn parse_block(body: &str) -> Result<(String, serde_json::Map<String, serde_json::Value>), String> {
    let mut name = None;
    let mut args_start = None;
    let mut line_start = 0;

    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if name.is_none() {
            if let Some(value) = trimmed.strip_prefix(NAME_PREFIX) {
                name = Some(unquote(value.trim()).to_string());
            }
        }
        if args_start.is_none() && trimmed.starts_with(ARGS_PREFIX) {
            args_start = Some(line_start + indent + ARGS_PREFIX.len());
        }
        line_start += line.len();
    }

    let name = name.ok_or_else(|| "missing 'name=' line".to_string())?;
    if name.is_empty() {
        return Err("empty tool name".to_string());
    }
    let args_start = args_start.ok_or_else(|| "missing 'args=' line".to_string())?;

    let arguments = parse_mapping(body[args_start..].trim())
        .map_err(|e| format!("invalid arguments for '{}': {}", name, e))?;

    Ok((name, arguments))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn invocations(extraction: Extraction) -> Vec<Invocation> {
        match extraction {
            Extraction::Invocations { invocations, .. } => invocations,
            Extraction::FinalAnswer(text) => panic!("expected invocations, got final answer: {}", text),
        }
    }

    #[test]
    fn test_plain_text_is_final_answer() {
        let extraction = extract_tool_calls("The answer is 42.");
        assert_eq!(extraction, Extraction::FinalAnswer("The answer is 42.".to_string()));
    }

    #[test]
    fn test_single_block() {
        let raw = "<tool_call>\nname=search\nargs={\"query\": \"capital of France\"}\n</tool_call>";
        let calls = invocations(extract_tool_calls(raw));

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(Value::Object(calls[0].arguments.clone()), json!({"query": "capital of France"}));
    }

    #[test]
    fn test_text_is_kept_verbatim_with_invocations() {
        let raw = "Let me look.\n<tool_call>\nname=search\nargs={\"query\": \"x\"}\n</tool_call>\n";
        match extract_tool_calls(raw) {
            Extraction::Invocations { text, .. } => assert_eq!(text, raw),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_multiple_blocks_get_sequential_ids() {
        let raw = "<tool_call>\nname=search\nargs={\"query\": \"a\"}\n</tool_call>\n\
                   some thinking\n\
                   <tool_call>\nname=reverse_string\nargs={\"text\": \"b\"}\n</tool_call>";
        let calls = invocations(ToolCallExtractor::with_prefix("call_3").extract(raw));

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_3_0");
        assert_eq!(calls[1].id, "call_3_1");
        assert_eq!(calls[1].name, "reverse_string");
    }

    #[test]
    fn test_unclosed_block_after_good_block() {
        let raw = "<tool_call>\nname=search\nargs={\"query\": \"a\"}\n</tool_call>\n\
                   <tool_call>\nname=search\nargs={\"query\": \"b\"}\n";
        let calls = invocations(extract_tool_calls(raw));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["query"], json!("a"));
    }

    #[test]
    fn test_unclosed_block_before_good_block() {
        let raw = "<tool_call>\nname=search\nargs={\"query\": \"a\"}\n\
                   <tool_call>\nname=search\nargs={\"query\": \"b\"}\n</tool_call>";
        let calls = invocations(extract_tool_calls(raw));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["query"], json!("b"));
    }

    #[test]
    fn test_bad_args_drop_only_that_block() {
        let raw = "<tool_call>\nname=search\nargs={\"query\": capital of France}\n</tool_call>\n\
                   <tool_call>\nname=search\nargs={\"query\": \"ok\"}\n</tool_call>";
        let calls = invocations(extract_tool_calls(raw));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[0].arguments["query"], json!("ok"));
    }

    #[test]
    fn test_all_blocks_invalid_falls_back_to_final_answer() {
        let raw = "<tool_call>\nname=search\nargs=query\n</tool_call>";
        assert_eq!(extract_tool_calls(raw), Extraction::FinalAnswer(raw.to_string()));
    }

    #[test]
    fn test_missing_name_or_args() {
        assert!(extract_tool_calls("<tool_call>\nargs={}\n</tool_call>").is_final());
        assert!(extract_tool_calls("<tool_call>\nname=search\n</tool_call>").is_final());
        assert!(extract_tool_calls("<tool_call>\nname=\nargs={}\n</tool_call>").is_final());
    }

    #[test]
    fn test_empty_args_is_zero_argument_call() {
        let calls = invocations(extract_tool_calls("<tool_call>\nname=list\nargs={}\n</tool_call>"));
        assert_eq!(calls[0].name, "list");
        assert!(calls[0].arguments.is_empty());
    }

    #[test]
    fn test_multiline_args_and_indentation() {
        let raw = "<tool_call>\n  name = \"search\"\n  args={\n    \"query\": \"x\",\n    \"limit\": 3\n  }\n</tool_call>";
        // `name = ` with spaces is not the grammar; only `name=` counts.
        assert!(extract_tool_calls(raw).is_final());

        let raw = "<tool_call>\n  name=\"search\"\n  args={\n    \"query\": \"x\",\n    \"limit\": 3\n  }\n</tool_call>";
        let calls = invocations(extract_tool_calls(raw));
        assert_eq!(calls[0].name, "search");
        assert_eq!(Value::Object(calls[0].arguments.clone()), json!({"query": "x", "limit": 3}));
    }

    #[test]
    fn test_stray_close_marker_is_ignored() {
        let raw = "</tool_call> nothing to see";
        assert!(extract_tool_calls(raw).is_final());
    }

    #[test]
    fn test_into_turn() {
        let turn = extract_tool_calls("plain").into_turn();
        assert_eq!(turn.text, "plain");
        assert!(!turn.has_invocations());

        let turn = extract_tool_calls("<tool_call>\nname=a\nargs={}\n</tool_call>").into_turn();
        assert_eq!(turn.invocations.len(), 1);
    }
}
