//! Frame loop driver (§4.5.4): advances the renderer's timeline frame by
//! frame, screenshots the stage element, and hands each frame to a sink
//! (the encoder's stdin, in the worker). The backpressure contract from §9
//! falls out naturally here: `FrameSink::write_frame` is expected to await a
//! blocking/async write to the encoder's pipe, which already suspends the
//! caller when the OS pipe buffer is full.

use std::time::Duration;

use tracing::{debug, info};

use crate::cancellation::CancellationFlag;
use crate::error::{BrowserError, BrowserResult};
use crate::job_context::JobContext;

/// Destination for rendered frames. `write_frame` returns `false` when the
/// encoder has already exited, telling the loop to abort.
pub trait FrameSink {
    fn write_frame(&mut self, index: u32, bytes: Vec<u8>) -> impl std::future::Future<Output = BrowserResult<bool>> + Send;
}

pub struct FrameLoopConfig {
    pub fps: f64,
    pub duration_secs: f64,
    pub frame_deadline: Duration,
}

impl FrameLoopConfig {
    pub fn frames_total(&self) -> u32 {
        (self.duration_secs * self.fps).ceil().max(0.0) as u32
    }
}

/// Progress callback invoked after each frame: `(frames_rendered, frames_total)`.
pub trait ProgressSink: Send {
    fn on_frame(&mut self, frames_rendered: u32, frames_total: u32);
}

/// Drive the frame loop to completion, returning the number of frames
/// written. Fails immediately on cancellation, renderer closure, or encoder
/// exit, per §4.5.4 step 1 and step 4.
pub async fn run_frame_loop<S: FrameSink>(ctx: &JobContext, cancellation: &CancellationFlag, config: &FrameLoopConfig, sink: &mut S, progress: &mut dyn ProgressSink) -> BrowserResult<u32> {
    let frames_total = config.frames_total();
    debug!("starting frame loop: {frames_total} frames at {} fps", config.fps);

    for i in 0..frames_total {
        if cancellation.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let time = i as f64 / config.fps;
        ctx.set_time(time, config.frame_deadline).await?;

        if cancellation.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let frame = ctx.capture_stage_screenshot(config.frame_deadline).await?;

        if cancellation.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let encoder_alive = sink.write_frame(i, frame).await?;
        if !encoder_alive {
            return Err(BrowserError::EncoderExited);
        }

        progress.on_frame(i + 1, frames_total);
    }

    info!("frame loop complete: {frames_total} frames written");
    Ok(frames_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_total_rounds_up() {
        let config = FrameLoopConfig { fps: 30.0, duration_secs: 10.1, frame_deadline: Duration::from_secs(5) };
        assert_eq!(config.frames_total(), 304);
    }

    #[test]
    fn zero_duration_yields_zero_frames() {
        let config = FrameLoopConfig { fps: 30.0, duration_secs: 0.0, frame_deadline: Duration::from_secs(5) };
        assert_eq!(config.frames_total(), 0);
    }
}
