//! Transcription handlers: the synchronous legacy `/transcribe`, the queued
//! `/transcribe/queue` + `/transcribe/status/:sessionId` pair (§4.4, §6).

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;
use autoclip_models::{JobId, JobStatus, SessionId, Transcript};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    pub session_id: SessionId,
    pub video_key: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeJobResponse {
    pub job_id: JobId,
    pub session_id: SessionId,
    pub status: JobStatus,
    pub stage: String,
    pub progress: u8,
    pub total_chunks: u32,
    pub completed_chunks: u32,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Transcript>,
}

impl From<autoclip_models::TranscribeJob> for TranscribeJobResponse {
    fn from(job: autoclip_models::TranscribeJob) -> Self {
        Self {
            job_id: job.id,
            session_id: job.session_id,
            status: job.status,
            stage: job.stage,
            progress: job.progress,
            total_chunks: job.total_chunks,
            completed_chunks: job.completed_chunks,
            retry_count: job.retry_count,
            error: job.error,
            result: job.result,
        }
    }
}

/// `POST /transcribe/queue`: enqueue (or return the existing dedup match)
/// and report back immediately without waiting for completion.
pub async fn transcribe_queue(State(state): State<AppState>, Json(request): Json<TranscribeRequest>) -> ApiResult<Json<TranscribeJobResponse>> {
    let (job_id, _deduped) = state
        .transcribe_scheduler
        .enqueue_or_dedup(request.session_id, request.video_key, request.language)
        .await;

    let job = state.transcribe_scheduler.get(&job_id).await.ok_or_else(|| ApiError::internal("job disappeared immediately after enqueue"))?;
    Ok(Json(job.into()))
}

/// `GET /transcribe/status/:sessionId`: the current (or most recent)
/// transcription job for a session.
pub async fn transcribe_status(State(state): State<AppState>, Path(session_id): Path<SessionId>) -> ApiResult<Json<TranscribeJobResponse>> {
    let job = state
        .transcribe_scheduler
        .get_by_session(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("no transcription job for session {session_id}")))?;

    Ok(Json(job.into()))
}

const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `POST /transcribe`: the synchronous legacy entry point. Enqueues onto the
/// same scheduler-driven pipeline as `/transcribe/queue` and polls until the
/// job reaches a terminal status, so there is exactly one transcription
/// pipeline implementation rather than a duplicated inline one.
pub async fn transcribe(State(state): State<AppState>, Json(request): Json<TranscribeRequest>) -> ApiResult<Json<TranscribeJobResponse>> {
    let (job_id, _deduped) = state
        .transcribe_scheduler
        .enqueue_or_dedup(request.session_id, request.video_key, request.language)
        .await;

    loop {
        let job = state.transcribe_scheduler.get(&job_id).await.ok_or_else(|| ApiError::internal("job disappeared during transcription"))?;
        if job.status.is_terminal() {
            return Ok(Json(job.into()));
        }
        tokio::time::sleep(SYNC_POLL_INTERVAL).await;
    }
}
