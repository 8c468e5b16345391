//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svar - question answering with a Bedrock-hosted model and tools
///
/// Asks a text-completion model a question, lets it call tools (web search,
/// task files, chessboard reading, audio and YouTube transcription) and
/// prints its final answer. The name "Svar" is Norwegian for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Bedrock model id, overriding the configuration
    #[arg(long, global = true, env = "SVAR_MODEL_ID")]
    pub model_id: Option<String>,

    /// AWS region, overriding the configuration
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the agent a question
    Ask {
        /// The question to ask
        #[arg(required_unless_present = "task")]
        question: Option<String>,

        /// Answer a cached benchmark question by task id instead
        #[arg(short, long, conflicts_with = "question")]
        task: Option<String>,

        /// Maximum number of model calls
        #[arg(short, long)]
        max_iterations: Option<usize>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a random benchmark question
    Random {
        /// Ask the scoring service for a question instead of using the cache
        #[arg(long)]
        online: bool,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List benchmark questions, fetching and caching them on first use
    Questions {
        /// Fetch the list again even if it is cached
        #[arg(short, long)]
        refresh: bool,
    },

    /// Show the prompt the model would receive for a question
    Prompt {
        /// The question to render
        question: String,
    },

    /// List the tools offered to the model
    Tools,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "model.region")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

impl Cli {
    /// Log level for the `svar` target. `-v` flags win over the configured level.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
