use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{required_str, single_string_schema, Tool};
use crate::error::{Result, SvarError};
use crate::tasks::{FileKind, TaskApi};
use crate::transcription::Transcriber;

/// Transcribes the audio file attached to a task.
pub struct TranscribeAudioTool {
    api: Arc<TaskApi>,
    transcriber: Arc<dyn Transcriber>,
}

impl TranscribeAudioTool {
    pub fn new(api: Arc<TaskApi>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self { api, transcriber }
    }
}

#[async_trait]
impl Tool for TranscribeAudioTool {
    fn name(&self) -> &str {
        "transcribe_audio"
    }

    fn description(&self) -> &str {
        "Transcribes the audio file attached to a task into text. Provide the task_id. \
         Do NOT use the file_downloader tool before this one."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("task_id", "The task ID whose audio file should be transcribed"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        let task_id = required_str(arguments, "task_id")?;
        let file = self.api.download_file(task_id).await?;

        if file.kind != FileKind::Audio {
            return Err(SvarError::Tool(format!(
                "The file for task {} is {}, not audio. Stop and report that it could not be transcribed.",
                task_id, file.kind
            )));
        }

        let name = file.name_or_default();
        let text = self.transcriber.transcribe(&name, file.bytes).await?;
        if text.is_empty() {
            return Ok("(the audio contains no recognisable speech)".to_string());
        }
        Ok(text)
    }
}
