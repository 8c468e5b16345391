//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::llm::BedrockAuth;
use crate::tasks::QuestionCache;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Svar Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let model = vec![
        check_model_credentials(),
        CheckResult::ok(
            "Model",
            &format!("{} ({}, {})", settings.model.model_id, settings.model.family, settings.model.region),
        ),
    ];
    print_section("Model", &model);
    checks.extend(model);

    let tools = vec![
        check_openai_api_key(),
        check_tool("yt-dlp", "yt-dlp --version", install_hint_ytdlp()),
        check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg()),
        check_fen_command(&settings.tools.fen_command),
    ];
    print_section("Tools", &tools);
    checks.extend(tools);

    let directories = check_directories(settings);
    print_section("Directories", &directories);
    checks.extend(directories);

    let config = vec![check_config_file()];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Svar.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s). Some tools may be unavailable to the model.",
            warnings
        ));
    } else {
        Output::success("All checks passed! Svar is ready to use.");
    }

    Ok(())
}

/// Check that Bedrock credentials are present.
fn check_model_credentials() -> CheckResult {
    match BedrockAuth::from_env() {
        Ok(auth) => CheckResult::ok("AWS credentials", &format!("configured ({})", auth.describe())),
        Err(_) => CheckResult::error(
            "AWS credentials",
            "not set",
            "Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or AWS_BEARER_TOKEN_BEDROCK",
        ),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let mut parts = version_cmd.split_whitespace();
    let Some(cmd) = parts.next() else {
        return CheckResult::error(name, "no command configured", hint);
    };

    match Command::new(cmd).args(parts).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::warning(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::warning(name, "not found", hint),
        Err(e) => CheckResult::warning(name, &format!("error: {}", e), hint),
    }
}

/// The chessboard predictor is only looked up on PATH, never executed.
fn check_fen_command(command: &str) -> CheckResult {
    let hint = "Set tools.fen_command to a program that prints FEN for an image path";
    let Some(program) = command.split_whitespace().next() else {
        return CheckResult::warning("board_to_fen", "no predictor configured", hint);
    };

    if find_on_path(program) {
        CheckResult::ok("board_to_fen", command)
    } else {
        CheckResult::warning("board_to_fen", &format!("{} not found", program), hint)
    }
}

fn find_on_path(program: &str) -> bool {
    let candidate = std::path::Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::warning(
            "OPENAI_API_KEY",
            "empty, transcription tools disabled",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "not set, transcription tools disabled",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check data directories and the question cache.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let cache = QuestionCache::new(settings.question_cache_path());
    match cache.load() {
        Ok(Some(questions)) => {
            let size = std::fs::metadata(cache.path())
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok(
                "Question cache",
                &format!("{} questions in {} ({})", questions.len(), cache.path().display(), size),
            ));
        }
        Ok(None) => results.push(CheckResult::warning(
            "Question cache",
            &format!("{} (not created yet)", cache.path().display()),
            "Fetch questions with: svar questions",
        )),
        Err(e) => results.push(CheckResult::error(
            "Question cache",
            &format!("unreadable: {}", e),
            "Refresh it with: svar questions --refresh",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: svar config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
