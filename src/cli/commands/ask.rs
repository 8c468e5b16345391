//! Ask command implementation.

use crate::agent::{Agent, AgentResponse};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::llm::BedrockInvoker;
use crate::tasks::QuestionCache;
use crate::tools::default_registry;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    question: Option<&str>,
    task_id: Option<&str>,
    max_iterations: Option<usize>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    let question = match (question, task_id) {
        (_, Some(task_id)) => {
            let cache = QuestionCache::new(settings.question_cache_path());
            match cache.find(task_id) {
                Ok(question) => question.prompt_text(),
                Err(e) => {
                    Output::info("Run 'svar questions' to fetch and cache the question list.");
                    return Err(e.into());
                }
            }
        }
        (Some(question), None) => question.to_string(),
        (None, None) => anyhow::bail!("Provide a question or --task <task_id>"),
    };

    let mut agent = build_agent(&settings)?;
    if let Some(max) = max_iterations {
        agent = agent.with_max_iterations(max);
    }

    let response = run_agent(&agent, &question).await;
    print_response(&response, json)
}

/// Wire up the Bedrock invoker, the built-in tools and the configured prompts.
pub(super) fn build_agent(settings: &Settings) -> Result<Agent> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    for warning in preflight::tool_warnings() {
        Output::warning(&warning);
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let invoker = Arc::new(BedrockInvoker::from_settings(&settings.model)?);
    let tools = default_registry(settings)?;

    Ok(Agent::from_settings(invoker, tools, settings, &prompts))
}

pub(super) async fn run_agent(agent: &Agent, question: &str) -> AgentResponse {
    let spinner = Output::spinner(&format!("Asking {}...", agent.model_name()));
    let response = agent.run(question).await;
    spinner.finish_and_clear();
    response
}

pub(super) fn print_response(response: &AgentResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        Output::agent_response(response);
    }
    Ok(())
}
