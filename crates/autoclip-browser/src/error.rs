//! Error types for the shared browser lifecycle and frame loop.

use thiserror::Error;

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to spawn webdriver binary {binary}: {source}")]
    SpawnFailed { binary: String, #[source] source: std::io::Error },

    #[error("webdriver did not become reachable within {0}s")]
    LaunchTimeout(u64),

    #[error("webdriver session error: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("webdriver command error: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("renderer contract element not found: {0}")]
    ElementNotFound(String),

    #[error("{step} did not complete within {elapsed_secs}s")]
    Timeout { step: String, elapsed_secs: u64 },

    #[error("renderer closed unexpectedly: {0}")]
    RendererClosed(String),

    #[error("captured frame buffer was suspiciously small ({0} bytes)")]
    ScreenshotTooSmall(usize),

    #[error("encoder exited before the frame loop finished")]
    EncoderExited,

    #[error("export job was cancelled")]
    Cancelled,
}

impl BrowserError {
    pub fn timeout(step: impl Into<String>, elapsed_secs: u64) -> Self {
        BrowserError::Timeout { step: step.into(), elapsed_secs }
    }
}
