//! Process runner: spawns external tools with a bounded stderr tail and an
//! explicit per-call deadline (§4.1). `run_process` is the non-streaming
//! contract used by ffprobe/yt-dlp/the face-crop helper; `FfmpegCommand` +
//! `FfmpegRunner` add progress parsing and stdin streaming for the encoder.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Bound on the stderr tail kept in memory per process (§4.1: "≈4 KB").
const STDERR_TAIL_BYTES: usize = 4096;

/// Result of a non-streaming external process invocation.
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr_tail: String,
}

impl ProcessOutput {
    /// Convert a non-zero exit into `ProcessFailed`, carrying the tail.
    pub fn into_result(self, step: &str) -> MediaResult<Vec<u8>> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(MediaError::process_failed(step, self.exit_code, self.stderr_tail))
        }
    }
}

/// Spawn `program args...`, waiting for completion under an optional deadline.
/// Spawn failures and non-zero exits are distinct `MediaError` variants.
pub async fn run_process(
    step: &str,
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> MediaResult<ProcessOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| MediaError::spawn_failed(step, source))?;

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");

    let stdout_handle = tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut reader = stdout;
        let _ = reader.read_to_end(&mut buf).await;
        buf
    });
    let stderr_handle = tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut reader = stderr;
        let _ = reader.read_to_end(&mut buf).await;
        tail_str(&buf, STDERR_TAIL_BYTES)
    });

    let status = match timeout {
        Some(d) => match tokio::time::timeout(d, child.wait()).await {
            Ok(r) => r.map_err(|source| MediaError::spawn_failed(step, source))?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(MediaError::timeout(step, d.as_secs()));
            }
        },
        None => child.wait().await.map_err(|source| MediaError::spawn_failed(step, source))?,
    };

    let stdout = stdout_handle.await.unwrap_or_default();
    let stderr_tail = stderr_handle.await.unwrap_or_default();

    Ok(ProcessOutput {
        exit_code: status.code(),
        success: status.success(),
        stdout,
        stderr_tail,
    })
}

/// Take the trailing `max_bytes` of a byte buffer as a lossily-decoded
/// string, snapped to the nearest UTF-8 char boundary.
fn tail_str(buf: &[u8], max_bytes: usize) -> String {
    let start = buf.len().saturating_sub(max_bytes);
    let mut start = start;
    while start < buf.len() && (buf[start] & 0xC0) == 0x80 {
        start += 1;
    }
    String::from_utf8_lossy(&buf[start..]).to_string()
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn tune(self, tune: impl Into<String>) -> Self {
        self.output_arg("-tune").output_arg(tune)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn pix_fmt(self, fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(fmt)
    }

    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-v".to_string());
        args.push(self.log_level.clone());
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Runner for FFmpeg commands with progress tracking, cancellation and deadline.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
    step: String,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self { cancel_rx: None, timeout_secs: None, step: "ffmpeg".to_string() }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = step.into();
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MediaError::spawn_failed(&self.step, source))?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut reader = BufReader::new(stderr).lines();

        let progress_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                    progress_callback(progress.clone());
                }
            }
        });

        let result = self.wait_for_completion(&mut child).await;
        let _ = progress_handle.await;
        result
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let wait_future = child.wait();

        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(Duration::from_secs(timeout_secs), wait_future).await {
                Ok(result) => result.map_err(|source| MediaError::spawn_failed(&self.step, source))?,
                Err(_) => {
                    warn!("{} timed out after {}s, killing process", self.step, timeout_secs);
                    let _ = child.kill().await;
                    return Err(MediaError::timeout(&self.step, timeout_secs));
                }
            }
        } else {
            wait_future.await.map_err(|source| MediaError::spawn_failed(&self.step, source))?
        };

        if let Some(ref cancel_rx) = self.cancel_rx {
            if *cancel_rx.borrow() {
                info!("{} cancelled, killing process", self.step);
                let _ = child.kill().await;
                return Err(MediaError::Cancelled);
            }
        }

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::process_failed(&self.step, status.code(), ""))
        }
    }
}

/// Parse a progress line from FFmpeg's `-progress` output.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = if key == "out_time_us" { us / 1000 } else { us };
                }
            }
            "out_time" => {
                current.out_time = value.to_string();
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    current.fps = fps;
                }
            }
            "speed" => {
                if value != "N/A" {
                    if let Some(speed_str) = value.strip_suffix('x') {
                        if let Ok(speed) = speed_str.parse() {
                            current.speed = speed;
                        }
                    }
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builder_emits_seek_and_codec_args() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_codec("libx264")
            .crf(18);

        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn progress_parsing_tracks_speed_and_completion() {
        let mut progress = FfmpegProgress::default();

        parse_progress_line("out_time_ms=5000000", &mut progress);
        assert_eq!(progress.out_time_ms, 5000000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let result = parse_progress_line("progress=end", &mut progress);
        assert!(result.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn tail_str_snaps_to_char_boundary() {
        let buf = "hello 世界".as_bytes();
        let tail = tail_str(buf, 4);
        assert!(String::from_utf8(tail.clone().into_bytes()).is_ok());
        assert!(!tail.is_empty());
    }
}
