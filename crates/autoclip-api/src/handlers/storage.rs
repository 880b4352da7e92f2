//! `/download-url`: mint a signed GET URL for an arbitrary object-store key
//! already owned by the caller (a clip, preview, or export artifact).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

const DOWNLOAD_URL_TTL_SECS: u64 = 3600;

#[derive(Deserialize)]
pub struct DownloadUrlRequest {
    pub key: String,
}

#[derive(Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

pub async fn download_url(State(state): State<AppState>, Json(request): Json<DownloadUrlRequest>) -> ApiResult<Json<DownloadUrlResponse>> {
    let url = state
        .storage
        .sign(&state.render_config.bucket, &request.key, std::time::Duration::from_secs(DOWNLOAD_URL_TTL_SECS))
        .await?;
    Ok(Json(DownloadUrlResponse { url }))
}
