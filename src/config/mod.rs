//! Configuration module for Svar.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, ToolPrompts};
pub use settings::{
    AgentSettings, GeneralSettings, ModelSettings, PromptSettings, SearchSettings, Settings,
    TaskSettings, ToolSettings, TranscriptionSettings,
};
