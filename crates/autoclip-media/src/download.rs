//! Remote-download ingest via yt-dlp, backing `POST /youtube`.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::command::run_process;
use crate::error::{MediaError, MediaResult};

/// Minimum file size (50 MB) below which an existing download is considered
/// incomplete and re-fetched.
const MIN_VIDEO_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Download a video from `url` to `output_path` via yt-dlp.
pub async fn download_video(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if let Ok(metadata) = output_path.metadata() {
        if metadata.len() > MIN_VIDEO_FILE_SIZE {
            info!("using existing download: {}", output_path.display());
            return Ok(());
        }
        warn!(
            "existing file {} is too small ({} bytes), re-downloading",
            output_path.display(),
            metadata.len()
        );
        tokio::fs::remove_file(output_path).await?;
    }

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    info!("downloading {} -> {}", url, output_path.display());

    let args = vec![
        "-f".to_string(),
        "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
        "-o".to_string(),
        output_path.to_string_lossy().to_string(),
        url.to_string(),
    ];

    let output = run_process("yt-dlp", "yt-dlp", &args, Some(Duration::from_secs(600))).await?;
    if !output.success {
        debug!("yt-dlp stderr: {}", output.stderr_tail);
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            output.stderr_tail.lines().last().unwrap_or("unknown error")
        )));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("output file not created"));
    }

    let file_size = output_path.metadata()?.len();
    info!("downloaded {} ({:.1} MB)", output_path.display(), file_size as f64 / (1024.0 * 1024.0));

    Ok(())
}

/// Whether a URL belongs to a platform yt-dlp is expected to handle.
pub fn is_supported_url(url: &str) -> bool {
    let supported_domains = ["youtube.com", "youtu.be", "vimeo.com", "twitter.com", "x.com", "twitch.tv", "tiktok.com"];
    supported_domains.iter().any(|domain| url.contains(domain))
}

/// Extract an 11-character YouTube video id from a `youtube.com`/`youtu.be` URL.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let patterns = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/embed/",
    ];
    for pattern in patterns {
        if let Some(idx) = url.find(pattern) {
            let rest = &url[idx + pattern.len()..];
            let id: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect();
            if id.len() == 11 {
                return Some(id);
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_supported_platforms() {
        assert!(is_supported_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_url("https://youtu.be/abc"));
        assert!(is_supported_url("https://vimeo.com/123"));
        assert!(!is_supported_url("https://example.com/video"));
    }

    #[test]
    fn extracts_youtube_id_from_known_url_shapes() {
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def45"),
            Some("abc123def45".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtu.be/abc123def45"),
            Some("abc123def45".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def45&list=xyz"),
            Some("abc123def45".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/embed/abc123def45"),
            Some("abc123def45".to_string())
        );
        assert_eq!(extract_youtube_id("https://example.com"), None);
        assert_eq!(extract_youtube_id("https://youtube.com/watch"), None);
        assert_eq!(extract_youtube_id("https://youtu.be/"), None);
        assert_eq!(extract_youtube_id("https://youtube.com/watch?v=abc123"), None);
    }
}
