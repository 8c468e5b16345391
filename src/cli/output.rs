//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::agent::{AgentResponse, RunOutcome};
use crate::tasks::Question;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one benchmark question as a list entry.
    pub fn question(question: &Question) {
        let level = question.level.as_deref().unwrap_or("?");
        let attachment = if question.has_file() {
            format!(" [{}]", question.file_name.as_deref().unwrap_or_default())
        } else {
            String::new()
        };
        println!(
            "  {} {} (level {}){}",
            style("*").cyan(),
            style(&question.task_id).bold(),
            level,
            style(attachment).dim()
        );
        println!("    {}", content_preview(&question.question, 120));
    }

    /// Print the outcome of an agent run.
    pub fn agent_response(response: &AgentResponse) {
        if !response.tool_calls.is_empty() {
            Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
            for call in &response.tool_calls {
                let marker = if call.is_error {
                    style("!").yellow()
                } else {
                    style("*").cyan()
                };
                println!("  {} {}", marker, content_preview(&call.to_string(), 80));
                println!("    {}", style(content_preview(&call.result, 100)).dim());
            }
        }

        println!("\n{}\n", response.content);

        match (response.outcome, &response.final_answer) {
            (RunOutcome::Answered, Some(answer)) => Output::success(&format!("Final answer: {}", answer)),
            (RunOutcome::Answered, None) => Output::warning("The model answered without a FINAL ANSWER line."),
            (outcome, _) => Output::warning(&format!("Run stopped early: {}", outcome)),
        }

        Output::info(&format!("Completed in {} iteration(s)", response.iterations));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Collapse newlines and truncate with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("line one\nline two", 100), "line one line two");
        assert_eq!(content_preview("æøåæøå", 3), "æøå...");
    }
}
