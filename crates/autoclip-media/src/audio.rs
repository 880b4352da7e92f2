//! Normalized audio extraction and fixed-duration segmentation for the
//! transcription pipeline (§4.4.1, §4.4.2).

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::{run_process, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Minimum fraction of source duration a normalized track must cover before
/// the pipeline is willing to call it usable, on sources longer than
/// `LONG_SOURCE_SECS`.
const MIN_COVERAGE_RATIO_LONG_SOURCE: f64 = 0.70;
const LONG_SOURCE_SECS: f64 = 8.0 * 60.0;

/// One scored candidate from the graded extraction strategy.
struct Candidate {
    path: PathBuf,
    exit_ok: bool,
    duration: f64,
    size: u64,
}

impl Candidate {
    /// `(exitOk, duration, size)` ordering from §4.4.1 step 3: clean exit
    /// beats dirty; among near-equal exit status, >1s longer duration wins;
    /// otherwise larger file size wins.
    fn is_better_than(&self, other: &Candidate) -> bool {
        if self.exit_ok != other.exit_ok {
            return self.exit_ok;
        }
        if (self.duration - other.duration).abs() > 1.0 {
            return self.duration > other.duration;
        }
        self.size > other.size
    }
}

/// Extract a normalized mono 16 kHz MP3 from `video_path`'s audio, trying
/// the implicit first-audio map and then every explicit audio stream index,
/// and keeping whichever candidate scores best. Writes `audio_clean.mp3`
/// inside `scratch_dir`.
pub async fn extract_normalized_audio(video_path: impl AsRef<Path>, scratch_dir: impl AsRef<Path>, bitrate: &str) -> MediaResult<PathBuf> {
    let video_path = video_path.as_ref();
    let scratch_dir = scratch_dir.as_ref();
    tokio::fs::create_dir_all(scratch_dir).await?;

    let probe = probe_video(video_path).await?;

    let mut maps: Vec<Option<u32>> = vec![None];
    maps.extend(probe.audio_stream_indices.iter().copied().map(Some));

    let mut candidates = Vec::new();
    for (i, map) in maps.iter().enumerate() {
        let candidate_path = scratch_dir.join(format!("audio_candidate_{i}.mp3"));
        if try_extract_candidate(video_path, &candidate_path, *map, bitrate).await.is_ok() {
            if let Ok(meta) = tokio::fs::metadata(&candidate_path).await {
                if meta.len() > 0 {
                    let candidate_probe = probe_video(&candidate_path).await.ok();
                    let duration = candidate_probe.and_then(|p| p.duration).unwrap_or(0.0);
                    candidates.push(Candidate { path: candidate_path, exit_ok: true, duration, size: meta.len() });
                    continue;
                }
            }
        }
        debug!("audio candidate {i} (map {map:?}) produced no usable output");
    }

    if candidates.is_empty() {
        return Err(MediaError::download_failed("no audio candidate could be extracted"));
    }

    let best = candidates
        .into_iter()
        .reduce(|a, b| if b.is_better_than(&a) { b } else { a })
        .expect("non-empty candidates");

    if let (Some(source_duration), best_duration) = (probe.duration, best.duration) {
        if source_duration > LONG_SOURCE_SECS && best_duration / source_duration < MIN_COVERAGE_RATIO_LONG_SOURCE {
            return Err(MediaError::AudioCorrupted);
        }
    }

    let canonical = scratch_dir.join("audio_clean.mp3");
    tokio::fs::copy(&best.path, &canonical).await?;

    let dir_entries = tokio::fs::read_dir(scratch_dir).await;
    if let Ok(mut entries) = dir_entries {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path != canonical && path.extension().map(|e| e == "mp3").unwrap_or(false) {
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
    }

    Ok(canonical)
}

async fn try_extract_candidate(input: &Path, output: &Path, map: Option<u32>, bitrate: &str) -> MediaResult<()> {
    let mut cmd = FfmpegCommand::new(input, output)
        .input_args(["-err_detect", "ignore_err"])
        .output_args(["-fflags", "+discardcorrupt+igndts"])
        .audio_codec("libmp3lame")
        .audio_bitrate(bitrate)
        .output_args(["-ar", "16000", "-ac", "1"])
        .output_arg("-vn");

    cmd = match map {
        Some(idx) => cmd.output_args(["-map", &format!("0:{idx}")]),
        None => cmd.output_args(["-map", "0:a:0?"]),
    };

    FfmpegRunner::new().with_step("audio extraction").with_timeout(300).run(&cmd).await
}

/// Split `audio_path` into fixed-duration, lexicographically-sortable
/// segments inside `scratch_dir`, via the encoder's segment muxer. Fails if
/// zero segments are produced.
pub async fn segment_audio(audio_path: impl AsRef<Path>, scratch_dir: impl AsRef<Path>, segment_seconds: u32) -> MediaResult<Vec<PathBuf>> {
    let audio_path = audio_path.as_ref();
    let scratch_dir = scratch_dir.as_ref();
    tokio::fs::create_dir_all(scratch_dir).await?;

    let pattern = scratch_dir.join("segment_%05d.mp3");
    let args = vec![
        "-y".to_string(),
        "-i".to_string(),
        audio_path.to_string_lossy().to_string(),
        "-f".to_string(),
        "segment".to_string(),
        "-segment_time".to_string(),
        segment_seconds.to_string(),
        "-reset_timestamps".to_string(),
        "1".to_string(),
        "-c".to_string(),
        "copy".to_string(),
        pattern.to_string_lossy().to_string(),
    ];

    let output = run_process("segmentation", "ffmpeg", &args, Some(Duration::from_secs(120))).await?;
    if !output.success {
        return Err(MediaError::process_failed("segmentation", output.exit_code, output.stderr_tail));
    }

    let mut segments = Vec::new();
    let mut entries = tokio::fs::read_dir(scratch_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with("segment_")).unwrap_or(false) {
            segments.push(path);
        }
    }
    segments.sort();

    if segments.is_empty() {
        warn!("segmentation of {} produced zero files", audio_path.display());
        return Err(MediaError::EmptySegmentation);
    }

    Ok(segments)
}

/// Graded WAV (mono 16 kHz PCM) fallback transcode for a segment that the
/// STT endpoint reported as undecodable (§4.4.3). Tries, in order: a direct
/// channel map, panning the first channel to mono, and a plain mono
/// downmix. Returns the first strategy that produces a non-empty file.
pub async fn transcode_to_wav_fallback(segment_path: impl AsRef<Path>, scratch_dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let segment_path = segment_path.as_ref();
    let scratch_dir = scratch_dir.as_ref();
    tokio::fs::create_dir_all(scratch_dir).await?;

    let output = scratch_dir.join("decode_fallback.wav");

    let strategies: [(&str, &[&str]); 3] = [
        ("map-channel", &["-map", "0:a:0?"]),
        ("pan-first-channel", &["-af", "pan=mono|c0=c0"]),
        ("mono-downmix", &["-ac", "1"]),
    ];

    for (name, extra_args) in strategies {
        let cmd = FfmpegCommand::new(segment_path, &output)
            .input_args(["-err_detect", "ignore_err"])
            .output_args(["-fflags", "+discardcorrupt+igndts"])
            .audio_codec("pcm_s16le")
            .output_args(["-ar", "16000", "-ac", "1"])
            .output_args(extra_args.iter().copied())
            .output_arg("-vn");

        let result = FfmpegRunner::new().with_step(format!("decode fallback ({name})")).with_timeout(60).run(&cmd).await;

        if result.is_ok() {
            if let Ok(meta) = tokio::fs::metadata(&output).await {
                if meta.len() > 0 {
                    debug!("decode fallback succeeded via {name}");
                    return Ok(output);
                }
            }
        }
    }

    Err(MediaError::download_failed("all decode fallback strategies failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(exit_ok: bool, duration: f64, size: u64) -> Candidate {
        Candidate { path: PathBuf::from("x.mp3"), exit_ok, duration, size }
    }

    #[test]
    fn clean_exit_beats_dirty_exit_regardless_of_size() {
        let clean = candidate(true, 1.0, 10);
        let dirty = candidate(false, 100.0, 100_000);
        assert!(clean.is_better_than(&dirty));
    }

    #[test]
    fn longer_duration_wins_past_one_second_margin() {
        let longer = candidate(true, 10.0, 10);
        let shorter = candidate(true, 8.5, 1_000_000);
        assert!(longer.is_better_than(&shorter));
    }

    #[test]
    fn near_equal_durations_fall_back_to_size() {
        let a = candidate(true, 10.0, 2000);
        let b = candidate(true, 10.5, 1000);
        assert!(a.is_better_than(&b));
    }
}
