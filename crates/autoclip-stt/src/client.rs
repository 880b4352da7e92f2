//! STT HTTP client with the three-way retry classification from §4.4.3.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{SttError, SttResult};
use crate::types::VerboseJsonResponse;
use crate::SegmentTranscription;

/// Configuration for the STT client, sourced from `AUTOCLIP_TRANSCRIBE_*` env
/// vars (§6).
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub connection_max_attempts: u32,
    pub connection_backoff: Duration,
    pub connection_max_backoff: Duration,
    pub openai_max_attempts: u32,
}

impl SttConfig {
    pub fn from_env() -> SttResult<Self> {
        Ok(Self {
            base_url: std::env::var("AUTOCLIP_STT_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            request_timeout: Duration::from_millis(env_u64("AUTOCLIP_TRANSCRIBE_OPENAI_TIMEOUT_MS", 120_000)),
            connection_max_attempts: env_u32("AUTOCLIP_TRANSCRIBE_OPENAI_CONNECTION_MAX_ATTEMPTS", 8),
            connection_backoff: Duration::from_millis(env_u64("AUTOCLIP_TRANSCRIBE_OPENAI_CONNECTION_BACKOFF_MS", 1_000)),
            connection_max_backoff: Duration::from_millis(env_u64("AUTOCLIP_TRANSCRIBE_OPENAI_CONNECTION_MAX_BACKOFF_MS", 30_000)),
            openai_max_attempts: env_u32("AUTOCLIP_TRANSCRIBE_OPENAI_MAX_ATTEMPTS", 3),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Client for the external speech-to-text endpoint.
pub struct SttClient {
    http: Client,
    config: SttConfig,
}

impl SttClient {
    pub fn new(config: SttConfig) -> SttResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build().map_err(SttError::from_transport)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> SttResult<Self> {
        Self::new(SttConfig::from_env()?)
    }

    /// Transcribe one segment, retrying per the §4.4.3 classification. On a
    /// decode error, transcode the segment to WAV once via `scratch_dir` and
    /// retry the request exactly once more.
    pub async fn transcribe_segment(&self, segment_path: impl AsRef<Path>, scratch_dir: impl AsRef<Path>, language_hint: Option<&str>) -> SttResult<SegmentTranscription> {
        let segment_path = segment_path.as_ref();

        match self.transcribe_with_retry(segment_path, language_hint).await {
            Ok(result) => Ok(result),
            Err(err) if err.is_decode() => {
                warn!("segment {} reported as undecodable, transcoding to WAV and retrying once", segment_path.display());
                let wav_path = autoclip_media::transcode_to_wav_fallback(segment_path, scratch_dir.as_ref()).await?;
                self.transcribe_once(&wav_path, language_hint).await
            }
            Err(err) => Err(err),
        }
    }

    /// Retry loop implementing the two retryable tiers from §4.4.3.
    async fn transcribe_with_retry(&self, segment_path: &Path, language_hint: Option<&str>) -> SttResult<SegmentTranscription> {
        let mut connection_attempt = 0u32;
        let mut retryable_attempt = 0u32;

        loop {
            match self.transcribe_once(segment_path, language_hint).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_connection() && connection_attempt + 1 < self.config.connection_max_attempts => {
                    connection_attempt += 1;
                    let delay = self.connection_backoff(connection_attempt);
                    warn!("STT connection error (attempt {connection_attempt}), retrying in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if matches!(err, SttError::Retryable(_)) && retryable_attempt + 1 < self.config.openai_max_attempts => {
                    retryable_attempt += 1;
                    let delay = Duration::from_millis(500);
                    warn!("STT retryable error (attempt {retryable_attempt}), retrying in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exponential backoff with jitter, capped at `connection_max_backoff`.
    fn connection_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.connection_backoff.as_millis() as u64;
        let cap = self.config.connection_max_backoff.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(20)).min(cap);
        let jitter = rand::thread_rng().gen_range(0..=exp / 4 + 1);
        Duration::from_millis(exp.saturating_sub(exp / 8).saturating_add(jitter))
    }

    async fn transcribe_once(&self, segment_path: &Path, language_hint: Option<&str>) -> SttResult<SegmentTranscription> {
        let bytes = tokio::fs::read(segment_path).await?;
        let filename = segment_path.file_name().and_then(|n| n.to_str()).unwrap_or("segment.mp3").to_string();

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename))
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word");

        if let Some(lang) = language_hint {
            form = form.text("language", lang.to_string());
        }

        let url = format!("{}/audio/transcriptions", self.config.base_url.trim_end_matches('/'));
        debug!("transcribing {} via {url}", segment_path.display());

        let response = self.http.post(&url).bearer_auth(&self.config.api_key).multipart(form).send().await.map_err(SttError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::from_response(status, &body));
        }

        let parsed: VerboseJsonResponse = response.json().await.map_err(SttError::from_transport)?;
        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SttConfig {
        SttConfig {
            base_url: "http://localhost".to_string(),
            api_key: "test".to_string(),
            request_timeout: Duration::from_secs(5),
            connection_max_attempts: 8,
            connection_backoff: Duration::from_millis(1_000),
            connection_max_backoff: Duration::from_millis(30_000),
            openai_max_attempts: 3,
        }
    }

    #[test]
    fn connection_backoff_never_exceeds_the_configured_ceiling() {
        let client = SttClient::new(config()).expect("client builds");
        for attempt in 1..=20 {
            let delay = client.connection_backoff(attempt);
            assert!(delay <= Duration::from_millis(30_000) + Duration::from_millis(30_000 / 4 + 1));
        }
    }

    #[test]
    fn connection_backoff_grows_with_attempt_number() {
        let client = SttClient::new(config()).expect("client builds");
        let early = client.connection_backoff(1);
        let later = client.connection_backoff(4);
        assert!(later >= early);
    }
}
