//! Error types for media operations.
//!
//! Spawn failures are a distinct kind from non-zero exits (§4.1); every
//! external-tool error carries the step label it failed under so callers can
//! report e.g. "screenshot frame 437" without re-deriving context.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("face-crop script not found at {0}")]
    FaceCropScriptNotFound(PathBuf),

    #[error("failed to spawn {step}: {source}")]
    SpawnFailed {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} exited with status {exit_code:?}: {stderr_tail}")]
    ProcessFailed {
        step: String,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),

    #[error("{step} timed out after {elapsed_secs}s")]
    Timeout { step: String, elapsed_secs: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("source audio appears heavily corrupted")]
    AudioCorrupted,

    #[error("segmentation produced no output files")]
    EmptySegmentation,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    pub fn process_failed(step: impl Into<String>, exit_code: Option<i32>, stderr_tail: impl Into<String>) -> Self {
        Self::ProcessFailed {
            step: step.into(),
            exit_code,
            stderr_tail: stderr_tail.into(),
        }
    }

    pub fn spawn_failed(step: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed { step: step.into(), source }
    }

    pub fn timeout(step: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout { step: step.into(), elapsed_secs }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed(message.into())
    }
}
