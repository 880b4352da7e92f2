//! Error classification for the STT client's retry logic (§4.4.3).

use thiserror::Error;

pub type SttResult<T> = Result<T, SttError>;

#[derive(Debug, Error)]
pub enum SttError {
    /// Network/DNS/reset/timeout, or a 408/429/5xx response — retried with
    /// exponential backoff and jitter.
    #[error("connection error: {0}")]
    Connection(String),

    /// Generic rate-limit/temporary failure — retried with a small fixed
    /// backoff and a low attempt ceiling.
    #[error("retryable error: {0}")]
    Retryable(String),

    /// Any other 4xx — surfaced immediately, no retry.
    #[error("non-retryable error: {0}")]
    NonRetryable(String),

    /// 413 — the segment itself is too large for the endpoint.
    #[error("segment too large for STT endpoint; reduce segment length")]
    ChunkTooLarge,

    /// "audio file could not be decoded" / "format is not supported" class
    /// of response body — triggers the WAV-fallback-then-retry-once path.
    #[error("STT endpoint could not decode the segment: {0}")]
    Decode(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("response body was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transcoding decode fallback failed: {0}")]
    Media(#[from] autoclip_media::MediaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SttError {
    /// Build an `SttError` from an HTTP status and response body, applying
    /// the classification rules in §4.4.3.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let lower = body.to_lowercase();

        if status.as_u16() == 413 {
            return SttError::ChunkTooLarge;
        }
        if lower.contains("audio file could not be decoded") || lower.contains("format is not supported") {
            return SttError::Decode(body.to_string());
        }
        if status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error() {
            return SttError::Connection(format!("{status}: {body}"));
        }
        if status.is_client_error() {
            return SttError::NonRetryable(format!("{status}: {body}"));
        }
        SttError::Retryable(format!("{status}: {body}"))
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SttError::Connection(format!("request timed out: {err}"))
        } else if err.is_connect() {
            SttError::Connection(format!("connect failed: {err}"))
        } else {
            SttError::Connection(format!("fetch failed: {err}"))
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, SttError::Connection(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SttError::Connection(_) | SttError::Retryable(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, SttError::Decode(_))
    }
}
