//! Ingest handlers: `/upload` (multipart) and `/youtube` (URL download).
//!
//! Both produce the same response shape: a fresh session id, the object-store
//! key of the uploaded source video, and its probed metadata. The session id
//! is opaque to the server after this point — callers pass it (and the
//! video key) back explicitly on every subsequent request, so there is no
//! server-side session store to keep consistent.

use axum::extract::{Multipart, State};
use axum::Json;
use autoclip_media::{download_video, probe_video};
use autoclip_models::{SessionId, VideoMetadata};
use autoclip_worker::ScratchDir;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::security::validate_video_url;
use crate::state::AppState;

#[derive(Serialize)]
pub struct IngestResponse {
    pub session_id: SessionId,
    pub video_key: String,
    pub metadata: VideoMetadata,
}

async fn finalize_ingest(state: &AppState, local_path: &std::path::Path) -> ApiResult<IngestResponse> {
    let info = probe_video(local_path).await?;
    let size = tokio::fs::metadata(local_path).await.map(|m| m.len()).unwrap_or(info.size.unwrap_or(0));

    let session_id = SessionId::new();
    let video_key = state.storage.upload_session_video(&state.render_config.bucket, &session_id, local_path).await?;

    let metadata = VideoMetadata {
        duration: info.duration,
        width: info.width,
        height: info.height,
        size,
    };

    info!(session_id = %session_id, video_key = %video_key, "ingested source video");

    Ok(IngestResponse { session_id, video_key, metadata })
}

/// `POST /upload` (multipart field `video`).
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<IngestResponse>> {
    let scratch = ScratchDir::create("ingest", SessionId::new().as_str())
        .await
        .map_err(|e| ApiError::internal(format!("failed to create scratch dir: {e}")))?;
    let local_path = scratch.join("input.mp4");

    let mut received = false;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::bad_request(e.to_string()))? {
        if field.name() != Some("video") {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
        tokio::fs::write(&local_path, &bytes).await.map_err(|e| ApiError::internal(format!("failed to write upload: {e}")))?;
        received = true;
        break;
    }

    if !received {
        return Err(ApiError::bad_request("Missing 'video' field in multipart upload"));
    }

    finalize_ingest(&state, &local_path).await.map(Json)
}

#[derive(Deserialize)]
pub struct YoutubeRequest {
    pub url: String,
}

/// `POST /youtube` `{url}`: download a supported video URL via yt-dlp, then
/// ingest it the same way as a direct upload.
pub async fn youtube(State(state): State<AppState>, Json(request): Json<YoutubeRequest>) -> ApiResult<Json<IngestResponse>> {
    let validated_url = validate_video_url(&request.url).into_result().map_err(ApiError::bad_request)?;

    let scratch = ScratchDir::create("ingest", SessionId::new().as_str())
        .await
        .map_err(|e| ApiError::internal(format!("failed to create scratch dir: {e}")))?;
    let local_path = scratch.join("input.mp4");

    download_video(&validated_url, &local_path).await?;

    finalize_ingest(&state, &local_path).await.map(Json)
}
