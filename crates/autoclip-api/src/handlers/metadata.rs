//! `/metadata`: re-probe a session's source video.

use axum::extract::State;
use axum::Json;
use autoclip_media::probe_video;
use autoclip_models::{SessionId, VideoMetadata};
use autoclip_worker::ScratchDir;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MetadataRequest {
    pub session_id: SessionId,
    pub video_key: String,
}

#[derive(Serialize)]
pub struct MetadataResponse {
    pub metadata: VideoMetadata,
}

pub async fn metadata(State(state): State<AppState>, Json(request): Json<MetadataRequest>) -> ApiResult<Json<MetadataResponse>> {
    let scratch = ScratchDir::create("metadata", request.session_id.as_str()).await?;
    let local_path = scratch.join("input.mp4");

    state.storage.download(&state.render_config.bucket, &request.video_key, &local_path).await?;
    let info = probe_video(&local_path).await?;
    let size = tokio::fs::metadata(&local_path).await.map(|m| m.len()).unwrap_or(info.size.unwrap_or(0));

    Ok(Json(MetadataResponse {
        metadata: VideoMetadata {
            duration: info.duration,
            width: info.width,
            height: info.height,
            size,
        },
    }))
}
