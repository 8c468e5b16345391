//! Svar - question answering with a completion model and tools
//!
//! Svar asks a text-completion model hosted on AWS Bedrock a question and
//! lets it call tools until it produces a final answer. The model has no
//! native tool calling, so the tool catalog is written into the prompt and
//! calls come back as `<tool_call>` blocks in the generated text.
//!
//! The name "Svar" is Norwegian for "answer."
//!
//! # Architecture
//!
//! - `conversation` - Turns, invocations and the append-only conversation
//! - `protocol` - Prompt formatting and tool-call extraction
//! - `llm` - The model invoker trait and the Bedrock implementation
//! - `agent` - The turn driver that ties everything together
//! - `tools` - Tool trait, registry and the built-in tools
//! - `tasks` - Client for the benchmark question service
//! - `audio` / `transcription` - YouTube audio download and Whisper
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svar::agent::Agent;
//! use svar::config::{Prompts, Settings};
//! use svar::llm::BedrockInvoker;
//! use svar::tools::default_registry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::default();
//!     let invoker = Arc::new(BedrockInvoker::from_settings(&settings.model)?);
//!     let agent = Agent::from_settings(invoker, default_registry(&settings)?, &settings, &prompts);
//!
//!     let response = agent.run("What is the capital of Norway?").await;
//!     println!("{} ({})", response.answer(), response.outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod audio;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod openai;
pub mod protocol;
pub mod tasks;
pub mod tools;
pub mod transcription;

#[cfg(test)]
mod testing;

pub use error::{Result, SvarError};
