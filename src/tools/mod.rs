//! Tools the agent can call on the model's behalf.
//!
//! Every tool implements [`Tool`]: a name, a description, an optional JSON
//! schema for its arguments, and an async `execute`. The [`ToolRegistry`]
//! holds the tools available to one agent, lists their descriptors for the
//! prompt catalog, and dispatches invocations by name.

mod board_to_fen;
mod file_download;
mod reverse_string;
mod search;
mod transcribe_audio;
mod youtube;

pub use board_to_fen::{validate_fen, BoardToFenTool};
pub use file_download::FileDownloaderTool;
pub use reverse_string::ReverseStringTool;
pub use search::{SearchResult, SearchTool};
pub use transcribe_audio::TranscribeAudioTool;
pub use youtube::YoutubeProcessorTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Result, SvarError};
use crate::tasks::TaskApi;
use crate::transcription::{Transcriber, WhisperTranscriber};

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments; `None` for tools without arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses in `name=`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            schema: self.parameters_schema(),
        }
    }
}

/// Tools available to one agent, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name replaces the earlier one
    /// in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Box::new(tool));
        self
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool by name.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| SvarError::ToolUnknown(name.to_string()))?;

        info!("Running tool {} with {}", name, serde_json::Value::Object(arguments.clone()));
        let output = tool.execute(arguments).await?;
        debug!("Tool {} returned {} characters", name, output.len());
        Ok(output)
    }
}

/// All built-in tools, wired up from settings.
pub fn default_registry(settings: &Settings) -> Result<ToolRegistry> {
    let api = Arc::new(TaskApi::from_settings(&settings.tasks)?);
    let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::from_settings(&settings.transcription)?);

    Ok(ToolRegistry::new()
        .with(SearchTool::from_settings(&settings.search)?)
        .with(FileDownloaderTool::new(Arc::clone(&api), settings.tools.max_file_chars))
        .with(BoardToFenTool::new(
            Arc::clone(&api),
            settings.tools.fen_command.clone(),
            settings.temp_dir(),
        ))
        .with(TranscribeAudioTool::new(Arc::clone(&api), Arc::clone(&transcriber)))
        .with(YoutubeProcessorTool::new(transcriber, settings.temp_dir()))
        .with(ReverseStringTool))
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match arguments.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.trim()),
        Some(Value::String(_)) => Err(SvarError::InvalidInput(format!("Parameter '{}' is empty", key))),
        Some(other) => Err(SvarError::InvalidInput(format!(
            "Parameter '{}' must be a string, got {}",
            key, other
        ))),
        None => Err(SvarError::InvalidInput(format!("Missing required parameter: {}", key))),
    }
}

/// Schema for a tool taking a single required string.
pub(crate) fn single_string_schema(key: &str, description: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(
        key.to_string(),
        serde_json::json!({"type": "string", "description": description}),
    );
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": [key]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text back."
        }

        fn parameters_schema(&self) -> Option<Value> {
            Some(single_string_schema("text", "Text to echo"))
        }

        async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
            Ok(required_str(arguments, "text")?.to_string())
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_registry_descriptors_in_order() {
        let registry = ToolRegistry::new().with(Echo).with(ReverseStringTool);
        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "reverse_string"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new().with(Echo);
        registry.register(Box::new(Echo));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_execute_dispatches_by_name() {
        let registry = ToolRegistry::new().with(Echo);
        let output = tokio_test::block_on(registry.execute("echo", &args(json!({"text": "hi"})))).unwrap();
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new().with(Echo);
        let err = registry.execute("nope", &Map::new()).await.unwrap_err();
        assert!(matches!(err, SvarError::ToolUnknown(ref name) if name == "nope"));
    }

    #[test]
    fn test_required_str() {
        let arguments = args(json!({"a": "x", "b": "  ", "c": 3}));
        assert_eq!(required_str(&arguments, "a").unwrap(), "x");
        assert!(required_str(&arguments, "b").is_err());
        assert!(required_str(&arguments, "c").unwrap_err().to_string().contains("must be a string"));
        assert!(required_str(&arguments, "d").unwrap_err().to_string().contains("Missing"));
    }

    #[test]
    fn test_descriptor_carries_schema() {
        let descriptor = Echo.descriptor();
        assert_eq!(descriptor.schema.unwrap()["required"][0], "text");
    }
}
