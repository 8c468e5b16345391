use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{required_str, single_string_schema, Tool};
use crate::error::Result;
use crate::tasks::{FileKind, TaskApi, TaskFile};

/// Downloads a task's attached file and shows it to the model.
pub struct FileDownloaderTool {
    api: Arc<TaskApi>,
    max_chars: usize,
}

impl FileDownloaderTool {
    pub fn new(api: Arc<TaskApi>, max_chars: usize) -> Self {
        Self { api, max_chars }
    }
}

#[async_trait]
impl Tool for FileDownloaderTool {
    fn name(&self) -> &str {
        "file_downloader"
    }

    fn description(&self) -> &str {
        "Downloads the file attached to a task and returns its contents. Text, JSON, Python and CSV \
         files are shown directly; images and audio are only summarised."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("task_id", "The task ID whose file should be downloaded"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        let task_id = required_str(arguments, "task_id")?;
        let file = self.api.download_file(task_id).await?;
        Ok(render_file(&file, self.max_chars))
    }
}

/// Render a task file as text for the model.
pub(crate) fn render_file(file: &TaskFile, max_chars: usize) -> String {
    let name = file.name_or_default();

    let body = match file.kind {
        FileKind::Json => match serde_json::from_slice::<Value>(&file.bytes) {
            Ok(value) => serde_json::to_string_pretty(&value).ok().map(|s| truncate(&s, max_chars)),
            Err(_) => file.text().map(|s| truncate(s, max_chars)),
        },
        kind if kind.is_text_like() => file.text().map(|s| truncate(s, max_chars)),
        _ => None,
    };

    match body {
        Some(content) => format!("File: {}\nType: {}\n\n{}", name, file.kind, content),
        None => {
            let hint = match file.kind {
                FileKind::Image => " Use board_to_fen for chessboard images.",
                FileKind::Audio => " Use transcribe_audio to get its text.",
                _ => "",
            };
            format!(
                "File: {}\nType: {} ({}, {} bytes)\n\nThe file is not text and cannot be shown.{}",
                name,
                file.kind,
                if file.content_type.is_empty() { "unknown content type" } else { file.content_type.as_str() },
                file.bytes.len(),
                hint
            )
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    format!(
        "{}\n\n[truncated: showing the first {} of {} characters]",
        text.chars().take(max_chars).collect::<String>(),
        max_chars,
        total
    )
}
