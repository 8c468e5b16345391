//! The text protocol spoken between the agent and a completion-only model.
//!
//! The model has no native tool calling, so tools are advertised in the
//! prompt and requested back through marker-delimited blocks:
//!
//! ```text
//! <tool_call>
//! name=search
//! args={"query": "capital of France"}
//! </tool_call>
//! ```
//!
//! - `formatter` flattens a [`Conversation`](crate::conversation::Conversation)
//!   and the tool catalog into one prompt string.
//! - `extractor` pulls invocation blocks back out of generated text.
//! - `literal` safely parses the `args=` mapping.

mod extractor;
mod formatter;
mod literal;

pub use extractor::{extract_tool_calls, Extraction, ToolCallExtractor};
pub use formatter::{render_tool_call, PromptFormatter};
pub use literal::{parse_mapping, LiteralError};

/// Opens an invocation block.
pub const TOOL_CALL_OPEN: &str = "<tool_call>";
/// Closes an invocation block.
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";
/// Opens a tool result in the transcript.
pub const TOOL_RESULT_OPEN: &str = "<tool_result>";
/// Closes a tool result in the transcript.
pub const TOOL_RESULT_CLOSE: &str = "</tool_result>";

const NAME_PREFIX: &str = "name=";
const ARGS_PREFIX: &str = "args=";
