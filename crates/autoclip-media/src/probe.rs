//! Media probe: invokes ffprobe and parses its JSON (§4.3). Fields the
//! container doesn't report come back `None`, never a panic or exception.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::command::run_process;
use crate::error::{MediaError, MediaResult};

/// Probed media information. All fields are `Option` because ffprobe may omit
/// any of them depending on container/codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub codec: Option<String>,
    pub size: Option<u64>,
    pub bitrate: Option<u64>,
    /// Ascending, de-duplicated stream indices of every audio stream.
    pub audio_stream_indices: Vec<u32>,
    /// Convenience alias for `audio_stream_indices.first()`.
    pub first_audio_stream: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize, Default)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a media file for duration/dimensions/fps/audio stream layout.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let args = vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = run_process("ffprobe", "ffprobe", &args, Some(Duration::from_secs(30))).await?;
    if !output.success {
        return Err(MediaError::ProbeFailed(output.stderr_tail));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let mut audio_stream_indices: Vec<u32> = probe
        .streams
        .iter()
        .filter(|s| s.codec_type == "audio")
        .map(|s| s.index)
        .collect();
    audio_stream_indices.sort_unstable();
    audio_stream_indices.dedup();
    let first_audio_stream = audio_stream_indices.first().copied();

    let duration = probe.format.duration.as_ref().and_then(|d| d.parse::<f64>().ok());
    let size = probe.format.size.as_ref().and_then(|s| s.parse::<u64>().ok());
    let bitrate = probe.format.bit_rate.as_ref().and_then(|b| b.parse::<u64>().ok());

    let fps = video_stream.and_then(|v| {
        v.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| v.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    Ok(VideoInfo {
        duration,
        width: video_stream.and_then(|v| v.width),
        height: video_stream.and_then(|v| v.height),
        fps,
        codec: video_stream.and_then(|v| v.codec_name.clone()),
        size,
        bitrate,
        audio_stream_indices,
        first_audio_stream,
    })
}

pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<Option<f64>> {
    let info = probe_video(path).await?;
    Ok(info.duration)
}

/// Parse a frame rate in rational `"N/D"` form or a plain decimal. Returns
/// `None` rather than a default when the value can't be parsed.
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_and_decimal_frame_rates() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn unparseable_frame_rate_is_none() {
        assert_eq!(parse_frame_rate("N/A"), None);
        assert_eq!(parse_frame_rate("0/0"), None);
    }
}
