//! `/preview`: a single low-resolution clip for fast client-side scrubbing,
//! rendered the same way as `/render` but forced to a 540p floor (§4.6, §6).

use axum::extract::State;
use axum::Json;
use autoclip_media::{create_clip, FaceCropMode, RenderEncoding};
use autoclip_models::{ClipRange, RenderQuality, SessionId};
use autoclip_worker::ScratchDir;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const PREVIEW_MIN_HEIGHT: u32 = 540;
const PREVIEW_URL_TTL_SECS: u64 = 3600;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub session_id: SessionId,
    pub video_key: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub preview_key: String,
    pub preview_url: String,
}

pub async fn preview(State(state): State<AppState>, Json(request): Json<PreviewRequest>) -> ApiResult<Json<PreviewResponse>> {
    let range = ClipRange { start: request.start, end: request.end };
    if !range.is_valid() {
        return Err(ApiError::bad_request("Invalid clip range."));
    }

    let Some(_permit) = state.render_admission.try_acquire() else {
        return Err(ApiError::Busy);
    };

    let scratch = ScratchDir::create("preview", request.session_id.as_str()).await?;
    let input_path = scratch.join("input.mp4");
    state.storage.download(&state.render_config.bucket, &request.video_key, &input_path).await?;

    let encoding = RenderEncoding {
        codec: "libx264".to_string(),
        preset: "veryfast".to_string(),
        crf: 21,
        audio_codec: "aac".to_string(),
        audio_bitrate: "128k".to_string(),
        max_fps: state.render_config.max_fps,
        min_height: PREVIEW_MIN_HEIGHT,
    };

    let output_path = scratch.join("preview.mp4");
    let face_crop_script = std::path::Path::new(&state.render_config.face_crop_script);
    let face_crop_script = face_crop_script.exists().then_some(face_crop_script);

    create_clip(&input_path, &output_path, &range, RenderQuality::Low, face_crop_script, FaceCropMode::Center, &encoding).await?;

    let preview_key = state
        .storage
        .upload_preview(&state.render_config.bucket, &request.session_id, request.start, request.end, &output_path)
        .await?;
    let preview_url = state
        .storage
        .sign(&state.render_config.bucket, &preview_key, std::time::Duration::from_secs(PREVIEW_URL_TTL_SECS))
        .await?;

    Ok(Json(PreviewResponse { preview_key, preview_url }))
}
