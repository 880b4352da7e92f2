//! Streaming H.264 encoder invocation for the editor export pipeline
//! (§4.5.5). `FfmpegCommand`/`FfmpegRunner` only drive file-based,
//! run-to-completion invocations, so the encoder is spawned directly here
//! with a piped stdin fed one frame at a time by the frame loop.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::{ExportConfig, FrameFormat};
use crate::error::{WorkerError, WorkerResult};

const STDERR_TAIL_BYTES: usize = 4096;

/// Parameters the export pipeline derives for one job: the render-mode
/// viewport, the target output dimensions, and the per-job thread budget
/// (`floor(CPU / maxExportConcurrency)`, minimum 1, per §4.5.5).
pub struct EncoderSpec<'a> {
    pub fps: f64,
    pub viewport: (u32, u32),
    pub output: (u32, u32),
    pub threads: u32,
    pub config: &'a ExportConfig,
}

/// A running encoder child process with a pipe-able stdin.
pub struct Encoder {
    child: Child,
    output_path: PathBuf,
}

impl Encoder {
    /// Spawn the encoder, reading an `image2pipe` stream of the configured
    /// frame format from stdin and writing H.264 to `output_path`.
    pub async fn spawn(output_path: impl Into<PathBuf>, spec: &EncoderSpec<'_>) -> WorkerResult<Self> {
        let output_path = output_path.into();
        let decoder_name = match spec.config.frame_format {
            FrameFormat::Png => "png_pipe",
            FrameFormat::Jpeg => "mjpeg",
        };

        let mut args: Vec<String> = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-framerate".to_string(),
            spec.fps.to_string(),
            "-vcodec".to_string(),
            decoder_name.to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
        ];

        if spec.viewport != spec.output {
            args.push("-vf".to_string());
            args.push(format!("scale={}:{}:flags={}", spec.output.0, spec.output.1, spec.config.scale_flags));
        }

        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            spec.config.preset.clone(),
            "-crf".to_string(),
            spec.config.crf.to_string(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-threads".to_string(),
            spec.threads.max(1).to_string(),
        ]);

        if let Some(tune) = &spec.config.tune {
            args.push("-tune".to_string());
            args.push(tune.clone());
        }

        args.push("-an".to_string());
        args.push(output_path.to_string_lossy().to_string());

        debug!("spawning encoder: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::dependency_failure(format!("failed to spawn encoder: {e}")))?;

        Ok(Self { child, output_path })
    }

    /// Write one frame to the encoder's stdin. Returns `false` once the pipe
    /// is closed (the encoder has exited), which the frame loop treats as
    /// "encoder exited early" and aborts on (§4.5.4).
    pub async fn write_frame(&mut self, bytes: &[u8]) -> bool {
        let Some(stdin) = self.child.stdin.as_mut() else {
            return false;
        };
        if let Err(e) = stdin.write_all(bytes).await {
            warn!("encoder stdin write failed, treating as exited: {e}");
            return false;
        }
        true
    }

    /// Close stdin and wait for the encoder to exit cleanly.
    pub async fn finish(mut self) -> WorkerResult<PathBuf> {
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().await.map_err(|e| WorkerError::dependency_failure(format!("encoder wait failed: {e}")))?;

        if !output.status.success() {
            return Err(WorkerError::dependency_failure(format!("encoder exited with {}: {}", output.status, tail_str(&output.stderr))));
        }

        Ok(self.output_path)
    }

    /// Kill the encoder immediately, for the frame loop's abort path.
    pub async fn kill(mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

fn tail_str(bytes: &[u8]) -> String {
    let mut start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    while start < bytes.len() && (bytes[start] & 0xC0) == 0x80 {
        start += 1;
    }
    String::from_utf8_lossy(&bytes[start..]).to_string()
}
