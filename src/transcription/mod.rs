//! Speech-to-text for audio attachments and downloaded video soundtracks.

mod whisper;

pub use whisper::{is_api_key_configured, WhisperTranscriber, MAX_UPLOAD_BYTES};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe encoded audio. `file_name` carries the format via its extension.
    async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> Result<String>;

    /// Transcribe an audio file on disk.
    async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let audio = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        self.transcribe(&file_name, audio).await
    }
}
