//! Audio mix build for the editor export pipeline (§4.5.6): translates the
//! timeline's audio-contributing clips into an ffmpeg `filter_complex` graph
//! and renders a single 48 kHz stereo WAV, independent of the frame loop.

use std::path::PathBuf;
use std::time::Duration;

use autoclip_media::run_process;
use autoclip_models::TimelineSnapshot;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};
use crate::scratch::ScratchDir;

/// Build the `atempo` chain needed to realize an arbitrary `speed` factor:
/// the filter only accepts factors in `[0.5, 2.0]`, so factors outside that
/// range are decomposed into repeated halving/doubling plus one residual
/// factor (§4.5.6).
fn tempo_chain(speed: f64) -> String {
    if (speed - 1.0).abs() <= 0.001 {
        return String::new();
    }

    let mut remaining = speed;
    let mut factors = Vec::new();
    while remaining > 2.0 {
        factors.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        factors.push(0.5);
        remaining *= 2.0;
    }
    factors.push(remaining);

    factors.iter().map(|f| format!(",atempo={f:.6}")).collect()
}

/// Render the audio mix to a WAV file in `scratch`, or return `None` if no
/// clip qualifies (the export is then video-only).
pub async fn build_audio_mix(scratch: &ScratchDir, timeline: &TimelineSnapshot, export_duration: f64) -> WorkerResult<Option<PathBuf>> {
    let contributing = timeline.audio_contributing_clips();
    if contributing.is_empty() {
        debug!("no audio-contributing clips; export will be video-only");
        return Ok(None);
    }

    let mut inputs = Vec::with_capacity(contributing.len());
    let mut chains = Vec::with_capacity(contributing.len());
    let mut labels = Vec::with_capacity(contributing.len());

    for (i, (clip, asset, settings)) in contributing.iter().enumerate() {
        let url = asset.url.clone().expect("audio_contributing_clips guarantees a url");
        inputs.push(url);

        let trimmed_duration = clip.duration * settings.speed;
        let mut chain = format!("[{i}:a]atrim=start={:.6}:duration={:.6},asetpts=PTS-STARTPTS", clip.start_offset, trimmed_duration);
        chain.push_str(&tempo_chain(settings.speed));

        if (settings.volume - 1.0).abs() > 0.001 {
            chain.push_str(&format!(",volume={:.6}", settings.volume));
        }

        if settings.fade_enabled {
            if settings.fade_in > 0.0 {
                chain.push_str(&format!(",afade=t=in:st=0:d={:.6}", settings.fade_in));
            }
            if settings.fade_out > 0.0 {
                let fade_out_start = (clip.duration - settings.fade_out).max(0.0);
                chain.push_str(&format!(",afade=t=out:st={fade_out_start:.6}:d={:.6}", settings.fade_out));
            }
        }

        let delay_ms = (clip.start_time * 1000.0).round().max(0.0) as i64;
        chain.push_str(&format!(",adelay={delay_ms}|{delay_ms}"));

        let label = format!("a{i}");
        chain.push_str(&format!("[{label}]"));
        chains.push(chain);
        labels.push(format!("[{label}]"));
    }

    chains.push(format!("{}amix=inputs={}:normalize=0,atrim=duration={:.6}[mixout]", labels.join(""), labels.len(), export_duration));
    let filter_complex = chains.join(";");

    let output = scratch.join("audio_mix.wav");
    let mut args: Vec<String> = vec!["-y".to_string()];
    for url in &inputs {
        args.push("-i".to_string());
        args.push(url.clone());
    }
    args.extend([
        "-filter_complex".to_string(),
        filter_complex,
        "-map".to_string(),
        "[mixout]".to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        output.to_string_lossy().to_string(),
    ]);

    let result = run_process("audio mix", "ffmpeg", &args, Some(Duration::from_secs(180))).await.map_err(WorkerError::from)?;
    if !result.success {
        return Err(WorkerError::dependency_failure(format!("audio mix failed: {}", result.stderr_tail)));
    }

    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_speed_contributes_no_tempo_filter() {
        assert_eq!(tempo_chain(1.0), "");
    }

    #[test]
    fn speed_above_two_is_decomposed_into_halving_steps() {
        let chain = tempo_chain(4.0);
        assert_eq!(chain.matches("atempo").count(), 2);
    }

    #[test]
    fn speed_below_half_is_decomposed_into_doubling_steps() {
        let chain = tempo_chain(0.2);
        assert!(chain.matches("atempo").count() >= 2);
    }
}
