//! Random command - answer a random benchmark question.

use super::ask::{build_agent, print_response, run_agent};
use crate::cli::Output;
use crate::config::Settings;
use crate::tasks::{QuestionCache, TaskApi};
use anyhow::Result;

/// Run the random command.
///
/// Uses the cached question list when there is one, otherwise asks the
/// scoring service.
pub async fn run_random(online: bool, json: bool, settings: Settings) -> Result<()> {
    let cache = QuestionCache::new(settings.question_cache_path());

    let cached = if online { None } else { cache.random()? };
    let question = match cached {
        Some(question) => question,
        None => {
            let api = TaskApi::from_settings(&settings.tasks)?;
            let spinner = Output::spinner("Fetching a random question...");
            let question = api.random_question().await;
            spinner.finish_and_clear();
            question?
        }
    };

    if !json {
        Output::header(&format!("Task {}", question.task_id));
        if let Some(level) = &question.level {
            Output::kv("Level", level);
        }
        if question.has_file() {
            Output::kv("File", question.file_name.as_deref().unwrap_or_default());
        }
        println!("\n{}\n", question.question);
    }

    let agent = build_agent(&settings)?;
    let response = run_agent(&agent, &question.prompt_text()).await;
    print_response(&response, json)
}
