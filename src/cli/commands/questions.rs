//! Questions command - list the benchmark questions.

use crate::cli::Output;
use crate::config::Settings;
use crate::tasks::{QuestionCache, TaskApi};
use anyhow::Result;

/// Run the questions command.
pub async fn run_questions(refresh: bool, settings: Settings) -> Result<()> {
    let cache = QuestionCache::new(settings.question_cache_path());

    let cached = if refresh { None } else { cache.load()? };
    let questions = match cached {
        Some(questions) => questions,
        None => {
            let api = TaskApi::from_settings(&settings.tasks)?;
            let spinner = Output::spinner(&format!("Fetching questions from {}...", api.base_url()));
            let fetched = api.questions().await;
            spinner.finish_and_clear();

            let questions = fetched?;
            cache.save(&questions)?;
            Output::success(&format!(
                "Cached {} questions at {}",
                questions.len(),
                cache.path().display()
            ));
            questions
        }
    };

    Output::header(&format!("Questions ({})", questions.len()));
    for question in &questions {
        Output::question(question);
    }
    println!();

    let with_files = questions.iter().filter(|q| q.has_file()).count();
    Output::info(&format!("{} question(s) have an attached file", with_files));
    Output::info("Answer one with: svar ask --task <task_id>");

    Ok(())
}
