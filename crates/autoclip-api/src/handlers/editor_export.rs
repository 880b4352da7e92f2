//! Editor export handlers: `/editor-export/start`, `/editor-export/status/:jobId`,
//! `/editor-export/cancel/:jobId` (§4.5, §6).

use axum::extract::{Path, State};
use axum::Json;
use autoclip_models::{Dimensions, ExportPayload, JobId, JobStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExportRequest {
    pub state: serde_json::Value,
    pub output: Dimensions,
    #[serde(default)]
    pub preview: Option<Dimensions>,
    #[serde(default)]
    pub fps: Option<f64>,
    pub duration: f64,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub render_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExportResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub stage: String,
    pub progress: f64,
    pub queue_position: usize,
    pub active_exports: u32,
    pub max_concurrency: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub stage: String,
    pub progress: f64,
    pub frames_rendered: u64,
    pub frames_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<autoclip_models::ExportJob> for ExportStatusResponse {
    fn from(job: autoclip_models::ExportJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            stage: job.stage,
            progress: job.progress,
            frames_rendered: job.frames_rendered,
            frames_total: job.frames_total,
            download_url: job.download_url,
            error: job.error,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelExportResponse {
    pub job_id: JobId,
    pub status: &'static str,
}

/// `POST /editor-export/start`.
pub async fn start_export(State(state): State<AppState>, Json(request): Json<StartExportRequest>) -> ApiResult<Json<StartExportResponse>> {
    let payload = ExportPayload {
        state: request.state,
        output: request.output,
        preview: request.preview,
        fps: request.fps.unwrap_or(30.0),
        duration: request.duration,
        fonts: request.fonts,
        name: request.name,
        requested_by: request.requested_by,
        render_url: request.render_url,
    };

    let (job_id, stats) = state.export_scheduler.enqueue(payload).await;

    Ok(Json(StartExportResponse {
        job_id,
        status: JobStatus::Queued,
        stage: "queued".to_string(),
        progress: 0.0,
        queue_position: stats.queued,
        active_exports: stats.active,
        max_concurrency: stats.max_concurrency,
    }))
}

/// `GET /editor-export/status/:jobId`.
pub async fn export_status(State(state): State<AppState>, Path(job_id): Path<JobId>) -> ApiResult<Json<ExportStatusResponse>> {
    let job = state.export_scheduler.get(&job_id).await.ok_or_else(|| crate::error::ApiError::not_found(format!("no export job {job_id}")))?;
    Ok(Json(job.into()))
}

/// `POST /editor-export/cancel/:jobId`.
pub async fn cancel_export(State(state): State<AppState>, Path(job_id): Path<JobId>) -> ApiResult<Json<CancelExportResponse>> {
    state.export_scheduler.request_cancel(&job_id).await?;
    Ok(Json(CancelExportResponse { job_id, status: "cancelling" }))
}
