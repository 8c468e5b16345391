use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{required_str, single_string_schema, Tool};
use crate::audio::{download_audio, extract_video_id, watch_url};
use crate::error::{Result, SvarError};
use crate::transcription::Transcriber;

/// Downloads a YouTube video's soundtrack and transcribes it.
pub struct YoutubeProcessorTool {
    transcriber: Arc<dyn Transcriber>,
    audio_dir: PathBuf,
}

impl YoutubeProcessorTool {
    /// Audio is kept under `<temp_dir>/youtube`, so repeated questions about
    /// the same video download it once.
    pub fn new(transcriber: Arc<dyn Transcriber>, temp_dir: PathBuf) -> Self {
        Self {
            transcriber,
            audio_dir: temp_dir.join("youtube"),
        }
    }
}

#[async_trait]
impl Tool for YoutubeProcessorTool {
    fn name(&self) -> &str {
        "youtube_processor"
    }

    fn description(&self) -> &str {
        "Extracts and transcribes the audio of a YouTube video. Provide the video URL \
         (e.g. https://www.youtube.com/watch?v=...). Use this whenever a question refers to a YouTube video."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("url", "The YouTube video URL"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        let url = required_str(arguments, "url")?;
        let video_id = extract_video_id(url)
            .ok_or_else(|| SvarError::InvalidInput(format!("Not a YouTube video URL: {}", url)))?;

        let audio = download_audio(&watch_url(&video_id), &video_id, &self.audio_dir).await?;
        info!("Transcribing {}", audio.display());

        let text = self.transcriber.transcribe_file(&audio).await?;
        if text.is_empty() {
            return Ok(format!("(no speech recognised in video {})", video_id));
        }
        Ok(format!("Transcript of video {}:\n{}", video_id, text))
    }
}
