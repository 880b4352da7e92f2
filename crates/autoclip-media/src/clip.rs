//! Render pipeline for short clips (§4.6): extract → face-crop → scale+mux.

use std::path::Path;
use tracing::info;

use autoclip_models::{ClipRange, RenderQuality};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::face_crop::{run_face_crop, FaceCropMode};
use crate::filters::{clamp_fps, filter_vertical_scale, target_height};
use crate::probe::probe_video;

/// Encoding parameters the caller derives from worker config.
#[derive(Debug, Clone)]
pub struct RenderEncoding {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub max_fps: f64,
    pub min_height: u32,
}

/// Create a vertical 9:16 clip from `range` of `input`, optionally running it
/// through the face-crop helper first.
///
/// Steps: seek-before-input extract to normalize timestamps/decoder
/// compatibility, then (if `face_crop_script` is set) the Python face-crop
/// helper, then a final scale+mux against the original clip's audio stream.
pub async fn create_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    range: &ClipRange,
    quality: RenderQuality,
    face_crop_script: Option<&Path>,
    face_crop_mode: FaceCropMode,
    encoding: &RenderEncoding,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!("rendering clip {:?} -> {} (quality: {:?})", range, output.display(), quality);

    let duration = range.duration();
    let scratch = tempfile::tempdir()?;

    let extracted = scratch.path().join("extracted.mp4");
    let extract_cmd = FfmpegCommand::new(input, &extracted)
        .seek(range.start)
        .duration(duration)
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .audio_codec("aac")
        .audio_bitrate(&encoding.audio_bitrate);

    FfmpegRunner::new().with_step("clip extract").with_timeout(120).run(&extract_cmd).await?;

    let cropped = match face_crop_script {
        Some(script) => {
            let crop_output = scratch.path().join("cropped.mp4");
            run_face_crop(script, &extracted, &crop_output, face_crop_mode).await?;
            crop_output
        }
        None => extracted,
    };

    let probe = probe_video(&cropped).await.ok();
    let height = target_height(quality, encoding.min_height);
    let fps = clamp_fps(probe.as_ref().and_then(|p| p.fps), encoding.max_fps);
    let scale_filter = filter_vertical_scale(height);

    let mux_cmd = FfmpegCommand::new(&cropped, output)
        .video_filter(scale_filter)
        .output_args(["-r", &format!("{fps}")])
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .faststart();

    FfmpegRunner::new().with_step("clip mux").with_timeout(120).run(&mux_cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_encoding_is_plain_data() {
        let enc = RenderEncoding {
            codec: "libx264".into(),
            preset: "veryfast".into(),
            crf: 20,
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
            max_fps: 30.0,
            min_height: 1280,
        };
        assert_eq!(enc.crf, 20);
    }
}
