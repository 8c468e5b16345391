//! Client for the scoring service that hands out questions and their files.
//!
//! Endpoints: `GET /questions`, `GET /random-question` and
//! `GET /files/{task_id}`.

mod cache;

pub use cache::QuestionCache;

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::TaskSettings;
use crate::error::{Result, SvarError};

/// One benchmark question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub task_id: String,
    pub question: String,
    #[serde(
        rename = "Level",
        default,
        deserialize_with = "level_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<String>,
    /// Name of the attached file; the service sends an empty string when there is none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Question {
    pub fn has_file(&self) -> bool {
        self.file_name.as_deref().is_some_and(|name| !name.trim().is_empty())
    }

    /// The text handed to the agent. Mentions the task id when a file is
    /// attached so the model can pass it to the file tools.
    pub fn prompt_text(&self) -> String {
        if self.has_file() {
            format!(
                "{}\n\n(task_id: {}, attached file: {})",
                self.question,
                self.task_id,
                self.file_name.as_deref().unwrap_or_default()
            )
        } else {
            self.question.clone()
        }
    }
}

fn level_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Coarse classification of a downloaded task file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Json,
    Python,
    Csv,
    Image,
    Audio,
    Binary,
}

impl FileKind {
    /// Classify from the Content-Type header, sniffing the leading bytes when
    /// the header is missing or generic.
    pub fn classify(content_type: &str, bytes: &[u8]) -> Self {
        let content_type = content_type.trim().to_ascii_lowercase();

        let by_header = if content_type.starts_with("application/json") {
            Some(FileKind::Json)
        } else if content_type.starts_with("text/csv") {
            Some(FileKind::Csv)
        } else if content_type.starts_with("text/x-python") || content_type.starts_with("application/x-python") {
            Some(FileKind::Python)
        } else if content_type.starts_with("text/") {
            Some(FileKind::Text)
        } else if content_type.starts_with("image/") {
            Some(FileKind::Image)
        } else if content_type.starts_with("audio/") {
            Some(FileKind::Audio)
        } else {
            None
        };

        by_header.or_else(|| Self::sniff(bytes)).unwrap_or(FileKind::Binary)
    }

    fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

        if bytes.starts_with(PNG) || bytes.starts_with(JPEG) {
            return Some(FileKind::Image);
        }
        if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0)
            || (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE")
        {
            return Some(FileKind::Audio);
        }
        None
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self, FileKind::Text | FileKind::Json | FileKind::Python | FileKind::Csv)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileKind::Text => "text",
            FileKind::Json => "json",
            FileKind::Python => "python",
            FileKind::Csv => "csv",
            FileKind::Image => "image",
            FileKind::Audio => "audio",
            FileKind::Binary => "binary",
        };
        write!(f, "{}", name)
    }
}

/// A file attached to a task.
#[derive(Debug, Clone)]
pub struct TaskFile {
    pub task_id: String,
    /// From Content-Disposition, when the service sends one.
    pub file_name: Option<String>,
    pub content_type: String,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

impl TaskFile {
    pub fn new(task_id: impl Into<String>, file_name: Option<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = content_type.into();
        let kind = FileKind::classify(&content_type, &bytes);
        Self {
            task_id: task_id.into(),
            file_name,
            content_type,
            kind,
            bytes,
        }
    }

    /// Contents as UTF-8, if they decode.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// A file name suitable for uploads and temp files.
    pub fn name_or_default(&self) -> String {
        if let Some(name) = self.file_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let extension = match self.kind {
            FileKind::Text => "txt",
            FileKind::Json => "json",
            FileKind::Python => "py",
            FileKind::Csv => "csv",
            FileKind::Image if self.bytes.starts_with(&[0xFF, 0xD8, 0xFF]) => "jpg",
            FileKind::Image => "png",
            FileKind::Audio if self.bytes.starts_with(b"RIFF") => "wav",
            FileKind::Audio => "mp3",
            FileKind::Binary => "bin",
        };
        format!("{}.{}", self.task_id, extension)
    }
}

/// HTTP client for the scoring service.
#[derive(Debug, Clone)]
pub struct TaskApi {
    base_url: String,
    client: reqwest::Client,
}

impl TaskApi {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &TaskSettings) -> Result<Self> {
        Self::new(&settings.base_url, settings.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full question list.
    #[instrument(skip(self))]
    pub async fn questions(&self) -> Result<Vec<Question>> {
        let url = format!("{}/questions", self.base_url);
        let response = self.get(&url).await?;
        let questions: Vec<Question> = response
            .json()
            .await
            .map_err(|e| SvarError::TaskApi(format!("Invalid question list: {}", e)))?;

        if questions.is_empty() {
            return Err(SvarError::TaskApi("Fetched question list is empty".to_string()));
        }
        info!("Fetched {} questions", questions.len());
        Ok(questions)
    }

    /// Fetch one random question.
    #[instrument(skip(self))]
    pub async fn random_question(&self) -> Result<Question> {
        let url = format!("{}/random-question", self.base_url);
        let response = self.get(&url).await?;
        response
            .json()
            .await
            .map_err(|e| SvarError::TaskApi(format!("Invalid question: {}", e)))
    }

    /// Download the file attached to a task.
    #[instrument(skip(self))]
    pub async fn download_file(&self, task_id: &str) -> Result<TaskFile> {
        let task_id = validate_task_id(task_id)?;
        let url = format!("{}/files/{}", self.base_url, task_id);
        let response = self.get(&url).await?;

        let headers = response.headers();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let file_name = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);

        let bytes = response.bytes().await?.to_vec();
        let file = TaskFile::new(task_id, file_name, content_type, bytes);
        debug!("Downloaded {} bytes ({}) for task {}", file.bytes.len(), file.kind, task_id);
        Ok(file)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SvarError::TaskApi(format!("Not found: {}", url)));
        }
        if !status.is_success() {
            return Err(SvarError::TaskApi(format!("GET {} returned {}", url, status)));
        }
        Ok(response)
    }
}

fn validate_task_id(task_id: &str) -> Result<&str> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(SvarError::InvalidInput("task_id is empty".to_string()));
    }
    if !task_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(SvarError::InvalidInput(format!("Invalid task_id: {}", task_id)));
    }
    Ok(task_id)
}

fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, Responder};

    #[test]
    fn test_question_deserialize() {
        let json = r#"{"task_id": "abc-1", "question": "How many?", "Level": "1", "file_name": ""}"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.level.as_deref(), Some("1"));
        assert!(!question.has_file());
        assert_eq!(question.prompt_text(), "How many?");

        let json = r#"{"task_id": "abc-2", "question": "Which move?", "Level": 2, "file_name": "board.png"}"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.level.as_deref(), Some("2"));
        assert!(question.has_file());
        assert!(question.prompt_text().contains("task_id: abc-2"));
    }

    #[test]
    fn test_classify_by_content_type() {
        assert_eq!(FileKind::classify("text/plain; charset=utf-8", b""), FileKind::Text);
        assert_eq!(FileKind::classify("application/json", b""), FileKind::Json);
        assert_eq!(FileKind::classify("text/csv", b""), FileKind::Csv);
        assert_eq!(FileKind::classify("text/x-python", b""), FileKind::Python);
        assert_eq!(FileKind::classify("image/png", b""), FileKind::Image);
        assert_eq!(FileKind::classify("audio/mpeg", b""), FileKind::Audio);
    }

    #[test]
    fn test_classify_sniffs_generic_types() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(FileKind::classify("application/octet-stream", png), FileKind::Image);
        assert_eq!(FileKind::classify("", b"ID3\x04\0\0"), FileKind::Audio);
        assert_eq!(FileKind::classify("", &[0xFF, 0xFB, 0x90, 0x00]), FileKind::Audio);
        assert_eq!(FileKind::classify("application/octet-stream", b"PK\x03\x04"), FileKind::Binary);
    }

    #[test]
    fn test_task_file_default_name() {
        let file = TaskFile::new("t1", None, "audio/mpeg", b"ID3".to_vec());
        assert_eq!(file.name_or_default(), "t1.mp3");

        let file = TaskFile::new("t1", Some("board.png".to_string()), "image/png", Vec::new());
        assert_eq!(file.name_or_default(), "board.png");
    }

    #[test]
    fn test_validate_task_id() {
        assert!(validate_task_id("8e867cd7-cff9-4e6c-867a-ff5ddc2550be").is_ok());
        assert!(validate_task_id("").is_err());
        assert!(validate_task_id("../etc/passwd").is_err());
    }

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="notes.txt""#).as_deref(),
            Some("notes.txt")
        );
        assert_eq!(disposition_file_name("inline"), None);
    }

    #[tokio::test]
    async fn test_download_file() {
        let responder = Responder::start(vec![CannedResponse::text(200, "text/plain", "hello")
            .with_header("Content-Disposition", "attachment; filename=\"hello.txt\"")])
        .await;

        let api = TaskApi::new(&responder.base_url, 5).unwrap();
        let file = api.download_file("task-1").await.unwrap();

        assert_eq!(file.kind, FileKind::Text);
        assert_eq!(file.text(), Some("hello"));
        assert_eq!(file.file_name.as_deref(), Some("hello.txt"));
        assert!(responder.requests()[0].request_line.starts_with("GET /files/task-1 "));
    }

    #[tokio::test]
    async fn test_questions_and_not_found() {
        let responder = Responder::start(vec![
            CannedResponse::json(200, r#"[{"task_id": "a", "question": "q?", "Level": "1", "file_name": ""}]"#),
            CannedResponse::json(404, r#"{"detail": "No file"}"#),
        ])
        .await;

        let api = TaskApi::new(&responder.base_url, 5).unwrap();
        let questions = api.questions().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].task_id, "a");

        let err = api.download_file("a").await.unwrap_err();
        assert!(matches!(err, SvarError::TaskApi(_)));
    }
}
