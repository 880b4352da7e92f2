//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHealth {
    pub active: u32,
    pub queued: usize,
    pub max_concurrency: u32,
    pub ffmpeg_threads_per_export: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionHealth {
    pub active: u32,
    pub queued: usize,
    pub max_concurrency: u32,
    /// Jobs this process is still tracking (active + queued), not yet
    /// evicted by the retention sweep.
    pub open_jobs: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub exports: ExportHealth,
    pub transcription: TranscriptionHealth,
}

/// `GET /health`: the only unauthenticated route. Reports liveness plus a
/// point-in-time snapshot of both schedulers' admission state.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let export_stats = state.export_scheduler.global_stats().await;
    let transcribe_stats = state.transcribe_scheduler.global_stats().await;

    let ffmpeg_threads_per_export = std::env::var("EDITOR_EXPORT_CPU_PER_JOB")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        exports: ExportHealth {
            active: export_stats.active,
            queued: export_stats.queued,
            max_concurrency: export_stats.max_concurrency,
            ffmpeg_threads_per_export,
        },
        transcription: TranscriptionHealth {
            active: transcribe_stats.active,
            queued: transcribe_stats.queued,
            max_concurrency: transcribe_stats.max_concurrency,
            open_jobs: transcribe_stats.active as usize + transcribe_stats.queued,
        },
    })
}
