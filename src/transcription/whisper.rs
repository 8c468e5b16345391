//! OpenAI Whisper transcription implementation.

use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::Transcriber;
use crate::config::TranscriptionSettings;
use crate::error::{Result, SvarError};
use crate::openai::create_client;

/// Largest upload the transcription endpoint accepts.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(model: &str, language: Option<&str>) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            language: language.map(str::to_string),
        }
    }

    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        if settings.model.trim().is_empty() {
            return Err(SvarError::Config("transcription.model is empty".to_string()));
        }
        Ok(Self::new(&settings.model, settings.language.as_deref()))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> Result<String> {
        check_upload_size(audio.len())?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name.to_string(), audio))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| SvarError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SvarError::OpenAI(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim().to_string();
        debug!("Transcribed {} characters", text.len());
        Ok(text)
    }
}

fn check_upload_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(SvarError::Transcription("Audio is empty".to_string()));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(SvarError::Transcription(format!(
            "Audio is {:.1} MB, above the {} MB upload limit",
            len as f64 / (1024.0 * 1024.0),
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_size_guard() {
        assert!(check_upload_size(1024).is_ok());
        assert!(check_upload_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(check_upload_size(0).is_err());

        let err = check_upload_size(MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(err.to_string().contains("25 MB upload limit"));
    }

    #[tokio::test]
    async fn test_oversized_audio_rejected_before_upload() {
        let transcriber = WhisperTranscriber::new("whisper-1", None);
        let err = transcriber
            .transcribe("big.mp3", vec![0u8; MAX_UPLOAD_BYTES + 1])
            .await
            .unwrap_err();
        assert!(matches!(err, SvarError::Transcription(_)));
    }

    #[test]
    fn test_from_settings_rejects_empty_model() {
        let settings = TranscriptionSettings {
            model: " ".to_string(),
            language: None,
        };
        assert!(WhisperTranscriber::from_settings(&settings).is_err());
    }
}
