//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("list failed: {0}")]
    ListFailed(String),

    #[error("presign failed: {0}")]
    PresignFailed(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("aws sdk error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Whether an upload error message indicates the streaming body was
    /// rejected and a buffered-body retry should be attempted (§4.2).
    pub fn is_stream_unsupported(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        ["duplex", "stream", "body", "unsupported"].iter().any(|needle| lower.contains(needle))
    }
}
