//! Audio acquisition from video sites.

mod downloader;

pub use downloader::{download_audio, normalize_to_mp3};

use regex::Regex;
use std::sync::OnceLock;

fn video_id_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(
                r"(?x)
                ^(?:https?://)?
                (?:www\.|m\.|music\.)?
                (?:
                    youtube\.com/(?:watch\?(?:.*&)?v=|embed/|v/|shorts/|live/)
                    |
                    youtu\.be/
                )
                ([a-zA-Z0-9_-]{11})
                (?:[?&\#/].*)?$
                ",
            )
            .ok()
        })
        .as_ref()
}

/// Extract the 11-character video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let caps = video_id_regex()?.captures(url.trim())?;
    caps.get(1).map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s"),
            id
        );
        assert_eq!(extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ#t=1"), id);
    }

    #[test]
    fn test_rejects_non_youtube() {
        assert_eq!(extract_video_id("https://vimeo.com/123456789"), None);
        assert_eq!(extract_video_id("https://evil.example/youtube.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
    }
}
