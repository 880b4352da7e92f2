//! Worker error types: the pipeline-facing half of §7's error taxonomy.
//! `BAD_REQUEST`/`UNAUTHORIZED`/`BUSY`/`NOT_FOUND` are produced at the RPC
//! boundary in `autoclip-api` instead, since they never arise mid-pipeline.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("dependency failed: {0}")]
    DependencyFailure(String),

    #[error("timed out waiting for {step}: {elapsed_secs}s")]
    Timeout { step: String, elapsed_secs: u64 },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("transient STT failure: {0}")]
    TransientStt(String),

    #[error("STT failure: {0}")]
    FatalStt(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("media error: {0}")]
    Media(#[from] autoclip_media::MediaError),

    #[error("storage error: {0}")]
    Storage(#[from] autoclip_storage::StorageError),

    #[error("browser error: {0}")]
    Browser(#[from] autoclip_browser::BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn dependency_failure(msg: impl Into<String>) -> Self {
        Self::DependencyFailure(msg.into())
    }

    pub fn timeout(step: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout { step: step.into(), elapsed_secs }
    }

    /// `true` for the connection-class failures §4.7 retries with backoff
    /// (currently only the STT client distinguishes this class).
    pub fn is_transient(&self) -> bool {
        matches!(self, WorkerError::TransientStt(_))
    }
}

impl From<autoclip_stt::SttError> for WorkerError {
    fn from(err: autoclip_stt::SttError) -> Self {
        if err.is_connection() {
            WorkerError::TransientStt(err.to_string())
        } else {
            WorkerError::FatalStt(err.to_string())
        }
    }
}
