//! Svar CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use svar::cli::{commands, Cli, Commands};
use svar::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let mut settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = cli.log_level(&settings.general.log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("svar={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    if let Some(model_id) = &cli.model_id {
        settings.model.model_id = model_id.clone();
    }
    if let Some(region) = &cli.region {
        settings.model.region = region.clone();
    }

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Ask {
            question,
            task,
            max_iterations,
            json,
        } => {
            commands::run_ask(question.as_deref(), task.as_deref(), *max_iterations, *json, settings).await?;
        }

        Commands::Random { online, json } => {
            commands::run_random(*online, *json, settings).await?;
        }

        Commands::Questions { refresh } => {
            commands::run_questions(*refresh, settings).await?;
        }

        Commands::Prompt { question } => {
            commands::run_prompt(question, &settings)?;
        }

        Commands::Tools => {
            commands::run_tools(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
