use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{required_str, single_string_schema, Tool};
use crate::error::{Result, SvarError};
use crate::tasks::{FileKind, TaskApi};

/// Turns a task's chessboard image into FEN using an external predictor.
///
/// The predictor is any command that takes an image path as its last
/// argument and prints the position on stdout.
pub struct BoardToFenTool {
    api: Arc<TaskApi>,
    command: String,
    temp_dir: PathBuf,
}

impl BoardToFenTool {
    pub fn new(api: Arc<TaskApi>, command: String, temp_dir: PathBuf) -> Self {
        Self { api, command, temp_dir }
    }

    #[instrument(skip(self, image))]
    async fn predict(&self, extension: &str, image: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("board-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.temp_dir)?;
        file.write_all(image)?;
        file.flush()?;

        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SvarError::Config("tools.fen_command is empty".to_string()))?;

        let output = Command::new(program)
            .args(parts)
            .arg(file.path())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SvarError::ToolNotFound(program.to_string())
                } else {
                    SvarError::ToolFailed(format!("{}: {}", program, e))
                }
            })?;

        if !output.status.success() {
            return Err(SvarError::ToolFailed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fen = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or_default()
            .to_string();
        debug!("Predictor printed {}", fen);

        validate_fen(&fen)?;
        Ok(fen)
    }
}

/// Check the piece-placement field of a FEN string.
pub fn validate_fen(fen: &str) -> Result<()> {
    let placement = fen.split_whitespace().next().unwrap_or_default();
    let ranks: Vec<&str> = placement.split('/').collect();

    if ranks.len() != 8 {
        return Err(SvarError::ToolFailed(format!(
            "Not a FEN position (expected 8 ranks): '{}'",
            fen
        )));
    }

    for (index, rank) in ranks.iter().enumerate() {
        let mut squares = 0u32;
        for c in rank.chars() {
            match c {
                '1'..='8' => squares += c.to_digit(10).unwrap_or(0),
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => squares += 1,
                other => {
                    return Err(SvarError::ToolFailed(format!(
                        "Invalid character '{}' in FEN rank {}",
                        other,
                        8 - index
                    )))
                }
            }
        }
        if squares != 8 {
            return Err(SvarError::ToolFailed(format!(
                "FEN rank {} covers {} squares instead of 8",
                8 - index,
                squares
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl Tool for BoardToFenTool {
    fn name(&self) -> &str {
        "board_to_fen"
    }

    fn description(&self) -> &str {
        "Converts the chessboard image attached to a task into a FEN string. Provide the task_id. \
         Do NOT use the file_downloader tool before this one."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(single_string_schema("task_id", "The task ID whose chessboard image should be analysed"))
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<String> {
        let task_id = required_str(arguments, "task_id")?;
        let file = self.api.download_file(task_id).await?;

        if file.kind != FileKind::Image {
            return Err(SvarError::Tool(format!(
                "The file for task {} is {}, not an image. Stop and report that the board could not be read.",
                task_id, file.kind
            )));
        }

        let name = file.name_or_default();
        let extension = name.rsplit('.').next().unwrap_or("png");
        self.predict(extension, &file.bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, Responder};
    use serde_json::json;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_validate_fen() {
        assert!(validate_fen(START).is_ok());
        assert!(validate_fen("3r2k1/pp3pp1/4b2p/7Q/3n4/PqBBR2P/5PP1/6K1 b - - 0 1").is_ok());
        assert!(validate_fen("8/8/8/8/8/8/8").is_err());
        assert!(validate_fen("9/8/8/8/8/8/8/8").is_err());
        assert!(validate_fen("rnbqkbnx/8/8/8/8/8/8/8").is_err());
        assert!(validate_fen("").is_err());
    }

    fn script_tool(dir: &std::path::Path, api: Arc<TaskApi>, script: &str) -> BoardToFenTool {
        let script_path = dir.join("predict.sh");
        std::fs::write(&script_path, script).unwrap();
        BoardToFenTool::new(
            api,
            format!("sh {}", script_path.display()),
            dir.join("tmp"),
        )
    }

    #[tokio::test]
    async fn test_runs_predictor_on_image() {
        let dir = tempfile::tempdir().unwrap();
        let responder = Responder::start(vec![CannedResponse::bytes(200, "image/png", PNG.to_vec())]).await;
        let api = Arc::new(TaskApi::new(&responder.base_url, 5).unwrap());
        let tool = script_tool(
            dir.path(),
            api,
            &format!("test -s \"$1\" || exit 3\necho loading model\necho '{}'\n", START),
        );

        let arguments = json!({"task_id": "chess-1"});
        let fen = tool.execute(arguments.as_object().unwrap()).await.unwrap();
        assert_eq!(fen, START);
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let responder = Responder::start(vec![CannedResponse::text(200, "text/plain", "not a board")]).await;
        let api = Arc::new(TaskApi::new(&responder.base_url, 5).unwrap());
        let tool = script_tool(dir.path(), api, "echo unreachable\n");

        let arguments = json!({"task_id": "chess-1"});
        let err = tool.execute(arguments.as_object().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("not an image"));
    }

    #[tokio::test]
    async fn test_invalid_predictor_output() {
        let dir = tempfile::tempdir().unwrap();
        let responder = Responder::start(vec![CannedResponse::bytes(200, "image/png", PNG.to_vec())]).await;
        let api = Arc::new(TaskApi::new(&responder.base_url, 5).unwrap());
        let tool = script_tool(dir.path(), api, "echo 'no idea'\n");

        let arguments = json!({"task_id": "chess-1"});
        assert!(matches!(
            tool.execute(arguments.as_object().unwrap()).await,
            Err(SvarError::ToolFailed(_))
        ));
    }
}
