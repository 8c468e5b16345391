//! Prompt command - show the first prompt of a run without calling the model.

use crate::config::{Prompts, Settings};
use crate::conversation::Conversation;
use crate::protocol::PromptFormatter;
use crate::tools::default_registry;
use anyhow::Result;

/// Run the prompt command.
pub fn run_prompt(question: &str, settings: &Settings) -> Result<()> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let tools = default_registry(settings)?;

    let conversation = Conversation::with_question(&prompts.system_prompt(), question);
    let prompt = PromptFormatter::from_prompts(&prompts.tools).format(&conversation, &tools.descriptors());

    println!("{}", prompt);
    Ok(())
}
