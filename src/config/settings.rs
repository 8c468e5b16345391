//! Configuration settings for Svar.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::{GenerationParams, ModelFamily};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub tasks: TaskSettings,
    pub search: SearchSettings,
    pub transcription: TranscriptionSettings,
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (question cache).
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error) when no `-v` flag or
    /// `RUST_LOG` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.svar".to_string(),
            temp_dir: "/tmp/svar".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Request body family (llama, mistral).
    pub family: ModelFamily,
    /// Bedrock model or inference profile id.
    pub model_id: String,
    /// AWS region hosting the model.
    pub region: String,
    /// Override for the runtime endpoint (e.g. a VPC endpoint or proxy).
    pub endpoint_url: Option<String>,
    pub temperature: f32,
    /// Maximum generated tokens per call.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before retry n is n times this value.
    pub retry_backoff_ms: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            family: ModelFamily::Llama,
            model_id: "us.meta.llama3-1-405b-instruct-v1:0".to_string(),
            region: "us-east-2".to_string(),
            endpoint_url: None,
            temperature: 0.2,
            max_tokens: 5000,
            timeout_secs: 120,
            max_attempts: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl ModelSettings {
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum model calls per question.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Scoring service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Base URL of the question/file API.
    pub base_url: String,
    /// Question cache file name, relative to the data directory.
    pub cache_file: String,
    pub timeout_secs: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            base_url: "https://agents-course-unit4-scoring.hf.space".to_string(),
            cache_file: "questions.json".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Web search tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// DuckDuckGo HTML endpoint.
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 5,
            timeout_secs: 20,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Settings for the individual tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Command that prints the FEN for a chessboard image path.
    pub fen_command: String,
    /// Longest file content handed back to the model, in characters.
    pub max_file_chars: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            fen_command: "board_to_fen".to_string(),
            max_file_chars: 20_000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory containing a custom `prompts.toml` (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the question cache path.
    pub fn question_cache_path(&self) -> PathBuf {
        self.data_dir().join(&self.tasks.cache_file)
    }
}
