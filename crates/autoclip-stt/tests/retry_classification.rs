//! Fault-injection tests for the STT retry classification (§4.4.3), using
//! `wiremock` to simulate connection-class failures, 413, and non-retryable
//! 4xx responses from the external endpoint.

use std::time::Duration;

use autoclip_stt::{SttClient, SttConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: String) -> SttConfig {
    SttConfig {
        base_url,
        api_key: "test-key".to_string(),
        request_timeout: Duration::from_secs(5),
        connection_max_attempts: 4,
        connection_backoff: Duration::from_millis(10),
        connection_max_backoff: Duration::from_millis(100),
        openai_max_attempts: 3,
    }
}

async fn segment_file() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().expect("tmp file");
    tokio::fs::write(file.path(), b"fake mp3 bytes").await.expect("write");
    file
}

#[tokio::test]
async fn transient_5xx_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "language": "en",
            "text": "hello world",
            "segments": [{"start": 0.0, "end": 1.0, "text": "hello world"}],
            "words": []
        })))
        .mount(&server)
        .await;

    let client = SttClient::new(test_config(server.uri())).expect("client builds");
    let segment = segment_file().await;
    let scratch = tempfile::tempdir().expect("scratch dir");

    let result = client.transcribe_segment(segment.path(), scratch.path(), None).await.expect("eventually succeeds");
    assert_eq!(result.text, "hello world");
    assert_eq!(result.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn chunk_too_large_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(413).set_body_string("payload too large"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SttClient::new(test_config(server.uri())).expect("client builds");
    let segment = segment_file().await;
    let scratch = tempfile::tempdir().expect("scratch dir");

    let err = client.transcribe_segment(segment.path(), scratch.path(), None).await.expect_err("413 surfaces immediately");
    assert!(matches!(err, autoclip_stt::SttError::ChunkTooLarge));
}

#[tokio::test]
async fn non_retryable_4xx_surfaces_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SttClient::new(test_config(server.uri())).expect("client builds");
    let segment = segment_file().await;
    let scratch = tempfile::tempdir().expect("scratch dir");

    let err = client.transcribe_segment(segment.path(), scratch.path(), None).await.expect_err("401 is non-retryable");
    assert!(matches!(err, autoclip_stt::SttError::NonRetryable(_)));
}

#[tokio::test]
async fn connection_retry_budget_is_exhausted_and_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = test_config(server.uri());
    config.connection_max_attempts = 2;
    let client = SttClient::new(config).expect("client builds");
    let segment = segment_file().await;
    let scratch = tempfile::tempdir().expect("scratch dir");

    let err = client.transcribe_segment(segment.path(), scratch.path(), None).await.expect_err("exhausted retries surface");
    assert!(matches!(err, autoclip_stt::SttError::Connection(_)));
}
