//! `/cleanup`: remove every object under a session's storage prefix once the
//! client is done with it.

use axum::extract::State;
use axum::Json;
use autoclip_models::SessionId;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub session_id: SessionId,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub removed: u32,
}

pub async fn cleanup(State(state): State<AppState>, Json(request): Json<CleanupRequest>) -> ApiResult<Json<CleanupResponse>> {
    let removed = state.storage.cleanup_session(&state.render_config.bucket, &request.session_id).await?;
    Ok(Json(CleanupResponse { success: true, removed }))
}
