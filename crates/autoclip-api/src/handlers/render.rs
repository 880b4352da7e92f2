//! `/render`: synchronous multi-clip extraction, bounded by `RenderAdmission`
//! rather than queued (§4.6, §9).

use axum::extract::State;
use axum::Json;
use autoclip_media::FaceCropMode;
use autoclip_models::{ClipRange, RenderQuality, SessionId};
use autoclip_worker::render_clips;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub session_id: SessionId,
    pub video_key: String,
    pub clips: Vec<ClipRange>,
    #[serde(default)]
    pub quality: RenderQuality,
    #[serde(default)]
    pub crop_mode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub index: usize,
    pub clip_key: String,
    pub download_url: String,
    pub filename: String,
}

#[derive(Serialize)]
pub struct RenderResponse {
    pub outputs: Vec<RenderOutput>,
}

fn parse_crop_mode(value: Option<&str>) -> FaceCropMode {
    match value {
        Some("track") => FaceCropMode::Track,
        _ => FaceCropMode::Center,
    }
}

pub async fn render(State(state): State<AppState>, Json(request): Json<RenderRequest>) -> ApiResult<Json<RenderResponse>> {
    if request.clips.is_empty() {
        return Err(ApiError::bad_request("At least one clip range is required"));
    }

    for (index, clip) in request.clips.iter().enumerate() {
        if !clip.is_valid() {
            return Err(ApiError::bad_request(format!("Invalid clip range at index {index}.")));
        }
    }

    let Some(_permit) = state.render_admission.try_acquire() else {
        return Err(ApiError::Busy);
    };

    let crop_mode = parse_crop_mode(request.crop_mode.as_deref());

    let rendered = render_clips(
        &state.storage,
        &state.render_config,
        &request.session_id,
        &request.video_key,
        &request.clips,
        request.quality,
        crop_mode,
    )
    .await?;

    let outputs = rendered
        .into_iter()
        .map(|c| RenderOutput { index: c.index, clip_key: c.clip_key, download_url: c.download_url, filename: c.filename })
        .collect();

    Ok(Json(RenderResponse { outputs }))
}
