//! Error types for Svar.

use thiserror::Error;

use crate::conversation::ConversationError;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inference endpoint could not be reached, timed out, or kept
    /// answering with a non-success status until the retry budget ran out.
    #[error("Could not reach model after {attempts} attempt(s): {message}")]
    ModelTransport { attempts: u32, message: String },

    /// The endpoint answered, but not in a shape we understand.
    #[error("Unexpected model response format: {0}")]
    ModelResponse(String),

    #[error("Unknown tool: {0}")]
    ToolUnknown(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Task API error: {0}")]
    TaskApi(String),

    #[error("Conversation contract violated: {0}")]
    Conversation(#[from] ConversationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SvarError {
    /// True when the model could not be reached at all, as opposed to
    /// answering badly.
    pub fn is_transport(&self) -> bool {
        matches!(self, SvarError::ModelTransport { .. })
    }
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
