//! yt-dlp download and ffmpeg normalisation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{Result, SvarError};

/// Extensions yt-dlp leaves behind when extraction stops short of MP3.
const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "opus", "webm", "ogg", "wav"];

/// Download the audio track of `url` as `<output_dir>/<video_id>.mp3`.
///
/// An existing file with that name is returned as is.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target = output_dir.join(format!("{}.mp3", video_id));
    if target.exists() {
        info!("Using cached audio file");
        return Ok(target);
    }

    info!("Downloading audio from {}", url);
    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let output = run(
        "yt-dlp",
        [
            OsStr::new("--format"),
            OsStr::new("bestaudio/best"),
            OsStr::new("--extract-audio"),
            OsStr::new("--audio-format"),
            OsStr::new("mp3"),
            OsStr::new("--audio-quality"),
            OsStr::new("192K"),
            OsStr::new("--no-check-certificates"),
            OsStr::new("--no-playlist"),
            OsStr::new("--quiet"),
            OsStr::new("--no-warnings"),
            OsStr::new("--output"),
            template.as_os_str(),
            OsStr::new(url),
        ],
    )
    .await?;

    if !output.status.success() {
        return Err(SvarError::AudioDownload(format!(
            "yt-dlp failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let downloaded = find_audio_file(output_dir, video_id)?;
    if downloaded != target {
        normalize_to_mp3(&downloaded, &target).await?;
        let _ = tokio::fs::remove_file(&downloaded).await;
    }

    Ok(target)
}

/// Re-encode any audio or video file to MP3.
pub async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {} to MP3", source.display());

    let output = run(
        "ffmpeg",
        [
            OsStr::new("-i"),
            source.as_os_str(),
            OsStr::new("-vn"),
            OsStr::new("-codec:a"),
            OsStr::new("libmp3lame"),
            OsStr::new("-qscale:a"),
            OsStr::new("2"),
            OsStr::new("-y"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            dest.as_os_str(),
        ],
    )
    .await?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SvarError::AudioDownload(format!(
            "ffmpeg conversion failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Run an external program, mapping a missing binary to `ToolNotFound`.
async fn run<'a>(program: &str, args: impl IntoIterator<Item = &'a OsStr>) -> Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SvarError::ToolNotFound(program.to_string())
            } else {
                SvarError::ToolFailed(format!("{}: {}", program, e))
            }
        })
}

/// Locate what yt-dlp wrote for `video_id`.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    if let Some(found) = AUDIO_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", video_id, ext)))
        .find(|candidate| candidate.exists())
    {
        return Ok(found);
    }

    std::fs::read_dir(dir)
        .map_err(|e| SvarError::AudioDownload(format!("Cannot read directory: {}", e)))?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(video_id))
                .unwrap_or(false)
        })
        .ok_or_else(|| SvarError::AudioDownload("Audio file not found after download".to_string()))
}
