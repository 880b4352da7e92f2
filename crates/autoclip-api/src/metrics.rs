//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "autoclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "autoclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "autoclip_http_requests_in_flight";

    // Queue metrics
    pub const QUEUE_ACTIVE: &str = "autoclip_queue_active";
    pub const QUEUE_LENGTH: &str = "autoclip_queue_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "autoclip_jobs_enqueued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "autoclip_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "autoclip_jobs_failed_total";
    pub const STT_RETRIES_TOTAL: &str = "autoclip_stt_retries_total";

    // Processing metrics
    pub const FFMPEG_DURATION_SECONDS: &str = "autoclip_ffmpeg_duration_seconds";
    pub const CLIPS_PROCESSED_TOTAL: &str = "autoclip_clips_processed_total";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "autoclip_download_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "autoclip_upload_duration_seconds";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "autoclip_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update a queue's active-job gauge (`queue` = "export"|"transcribe").
pub fn set_queue_active(queue: &str, active: u32) {
    let labels = [("queue", queue.to_string())];
    gauge!(names::QUEUE_ACTIVE, &labels).set(active as f64);
}

/// Update a queue's queued-job gauge.
pub fn set_queue_length(queue: &str, length: u64) {
    let labels = [("queue", queue.to_string())];
    gauge!(names::QUEUE_LENGTH, &labels).set(length as f64);
}

/// Record job enqueued.
pub fn record_job_enqueued(job_type: &str) {
    let labels = [("type", job_type.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record job completed.
pub fn record_job_completed(job_type: &str) {
    let labels = [("type", job_type.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record job failed.
pub fn record_job_failed(job_type: &str) {
    let labels = [("type", job_type.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record an STT retry attempt, labeled by the classified error kind
/// (`connection`|`retryable`).
pub fn record_stt_retry(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::STT_RETRIES_TOTAL, &labels).increment(1);
}

/// Record FFmpeg processing duration.
pub fn record_ffmpeg_duration(step: &str, duration_secs: f64) {
    let labels = [("step", step.to_string())];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record clip processed.
pub fn record_clip_processed(quality: &str) {
    let labels = [("quality", quality.to_string())];
    counter!(names::CLIPS_PROCESSED_TOTAL, &labels).increment(1);
}

/// Record download duration.
pub fn record_download_duration(duration_secs: f64) {
    histogram!(names::DOWNLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize a request path for use as a metrics label: replace any segment
/// that looks like an opaque id (a UUID, or a long alphanumeric/hyphen
/// token) with `:id`, so per-job/session paths collapse into one series.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| if is_opaque_id(segment) { ":id" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_opaque_id(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    is_uuid_like(segment)
}

fn is_uuid_like(segment: &str) -> bool {
    let groups: Vec<&str> = segment.split('-').collect();
    let expected_lengths = [8, 4, 4, 4, 12];
    groups.len() == expected_lengths.len()
        && groups.iter().zip(expected_lengths).all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_path_redacts_uuid_segments() {
        assert_eq!(
            sanitize_path("/editor-export/status/550e8400-e29b-41d4-a716-446655440000"),
            "/editor-export/status/:id"
        );
    }

    #[test]
    fn sanitize_path_redacts_numeric_segments() {
        assert_eq!(sanitize_path("/videos/42/clips"), "/videos/:id/clips");
    }

    #[test]
    fn sanitize_path_leaves_plain_segments_alone() {
        assert_eq!(sanitize_path("/transcribe/queue"), "/transcribe/queue");
    }
}
