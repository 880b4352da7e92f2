//! Render pipeline (§4.6): per-clip-range extract → face-crop → scale+mux,
//! invoked synchronously from the RPC handler and bounded by
//! `RenderAdmission`, not queued like export/transcribe.

use std::path::Path;

use autoclip_media::{create_clip, FaceCropMode, RenderEncoding};
use autoclip_models::{ClipRange, RenderQuality, SessionId};
use autoclip_storage::StorageClient;
use tracing::info;

use crate::config::RenderConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::scratch::ScratchDir;

/// One successfully rendered clip, ready to be surfaced in the RPC response.
pub struct RenderedClip {
    pub index: usize,
    pub clip_key: String,
    pub download_url: String,
    pub filename: String,
}

fn render_encoding(config: &RenderConfig) -> RenderEncoding {
    RenderEncoding {
        codec: "libx264".to_string(),
        preset: "veryfast".to_string(),
        crf: 21,
        audio_codec: "aac".to_string(),
        audio_bitrate: "128k".to_string(),
        max_fps: config.max_fps,
        min_height: config.min_height,
    }
}

/// Render every requested clip range out of the session's source video,
/// uploading each to object storage and returning a signed download URL.
pub async fn render_clips(
    storage: &StorageClient,
    config: &RenderConfig,
    session_id: &SessionId,
    video_key: &str,
    ranges: &[ClipRange],
    quality: RenderQuality,
    crop_mode: FaceCropMode,
) -> WorkerResult<Vec<RenderedClip>> {
    let scratch = ScratchDir::create("render", session_id.as_str()).await?;

    let input_path = scratch.join("input.mp4");
    storage.download(&config.bucket, video_key, &input_path).await.map_err(|e| WorkerError::StorageFailure(e.to_string()))?;

    let encoding = render_encoding(config);
    let face_crop_script = Path::new(&config.face_crop_script);
    let face_crop_script = face_crop_script.exists().then_some(face_crop_script);

    let mut outputs = Vec::with_capacity(ranges.len());
    for (index, range) in ranges.iter().enumerate() {
        let filename = format!("clip_{index:03}.mp4");
        let output_path = scratch.join(&filename);

        create_clip(&input_path, &output_path, range, quality, face_crop_script, crop_mode, &encoding).await?;

        let clip_key = storage.upload_clip(&config.bucket, session_id, &filename, &output_path).await.map_err(|e| WorkerError::StorageFailure(e.to_string()))?;
        let download_url = storage.sign(&config.bucket, &clip_key, std::time::Duration::from_secs(3600)).await.map_err(|e| WorkerError::StorageFailure(e.to_string()))?;

        info!("rendered clip {index} for session {session_id} -> {clip_key}");
        outputs.push(RenderedClip { index, clip_key, download_url, filename });
    }

    Ok(outputs)
}
