//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials and tools are available before a
//! run starts, so a missing key fails fast instead of after the first
//! model call.

use crate::error::{Result, SvarError};
use crate::llm::BedrockAuth;
use crate::transcription::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Running the agent requires model credentials.
    Ask,
    /// Listing and rendering need nothing external.
    Inspect,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ask => {
            BedrockAuth::from_env()?;
        }
        Operation::Inspect => {}
    }
    Ok(())
}

/// Things that only degrade individual tools. The agent still runs; the
/// affected tools report errors back to the model.
pub fn tool_warnings() -> Vec<String> {
    let mut warnings = Vec::new();

    if !is_api_key_configured() {
        warnings.push("OPENAI_API_KEY is not set; audio transcription tools will fail.".to_string());
    }
    for tool in ["yt-dlp", "ffmpeg"] {
        if let Err(e) = check_tool(tool) {
            warnings.push(format!("{}; youtube_processor will fail.", e));
        }
    }

    warnings
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SvarError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SvarError::ToolNotFound(name.to_string())),
        Err(e) => Err(SvarError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_has_no_requirements() {
        assert!(check(Operation::Inspect).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let err = check_tool("svar-definitely-not-installed").unwrap_err();
        assert!(matches!(err, SvarError::ToolNotFound(_)));
    }
}
