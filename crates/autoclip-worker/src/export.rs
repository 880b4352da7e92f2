//! Editor export pipeline (§4.5): shared-browser render loop piped into the
//! encoder, an independently-built audio mix, final mux, and upload —
//! driving the `queued → loading → rendering → encoding → uploading →
//! complete` state machine (§4.5.8).

use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use autoclip_browser::{build_navigation_url, compute_render_mode, round_down_even, BrowserError, CancellationFlag, FrameLoopConfig, FrameSink, JobContext, ProgressSink, SharedBrowser};
use autoclip_media::run_process;
use autoclip_models::{ExportJob, JobId, TimelineSnapshot};
use autoclip_scheduler::{ExportScheduler, JobExecutor};
use autoclip_storage::StorageClient;
use tracing::{info, warn};

use crate::audio_mix::build_audio_mix;
use crate::config::ExportConfig;
use crate::encoder::{Encoder, EncoderSpec};
use crate::error::{WorkerError, WorkerResult};
use crate::scratch::ScratchDir;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ExportExecutor {
    scheduler: OnceLock<Weak<ExportScheduler>>,
    browser: Arc<SharedBrowser>,
    storage: Arc<StorageClient>,
    config: ExportConfig,
    export_concurrency: u32,
}

impl ExportExecutor {
    pub fn new(browser: Arc<SharedBrowser>, storage: Arc<StorageClient>, config: ExportConfig, export_concurrency: u32) -> Arc<Self> {
        Arc::new(Self { scheduler: OnceLock::new(), browser, storage, config, export_concurrency })
    }

    pub fn bind_scheduler(&self, scheduler: &Arc<ExportScheduler>) {
        let _ = self.scheduler.set(Arc::downgrade(scheduler));
    }

    fn scheduler(&self) -> Arc<ExportScheduler> {
        self.scheduler.get().and_then(Weak::upgrade).expect("scheduler bound before jobs execute")
    }

    fn threads_per_job(&self) -> u32 {
        let cpus = std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1);
        (cpus / self.export_concurrency.max(1)).max(1)
    }

    async fn run(&self, job_id: &JobId, job: &ExportJob) -> WorkerResult<String> {
        let scheduler = self.scheduler();
        let scratch = ScratchDir::create("export", job_id.as_str()).await?;

        scheduler.with_job_mut(job_id, |j| j.set_status(autoclip_models::JobStatus::Loading)).await.ok();
        scheduler.with_job_mut(job_id, |j| j.set_progress("loading", 0.03)).await.ok();

        let editor_base_url = job.payload.render_url.clone().or_else(|| self.config.render_url.clone()).ok_or_else(|| WorkerError::dependency_failure("no render URL configured"))?;
        let render_secret = self.config.render_secret.clone().unwrap_or_default();
        let navigation_url = build_navigation_url(&editor_base_url, &render_secret, job_id);

        let plan = compute_render_mode(job.payload.output, job.payload.preview);

        let handle = self.browser.get_or_launch().await.map_err(classify_browser_error)?;
        let ctx = JobContext::open(&handle, &plan).await.map_err(classify_browser_error)?;

        let nav_timeout = Duration::from_secs(30);
        let ready_timeout = Duration::from_secs(30);
        if let Err(e) = ctx.navigate_and_wait_ready(&navigation_url, nav_timeout, ready_timeout).await {
            ctx.close().await;
            return Err(classify_browser_error(e));
        }

        scheduler.with_job_mut(job_id, |j| j.set_progress("loading", 0.05)).await.ok();
        scheduler.with_job_mut(job_id, |j| j.set_status(autoclip_models::JobStatus::Rendering)).await.ok();

        let output_dims = (round_down_even(job.payload.output.width), round_down_even(job.payload.output.height));
        let viewport_dims = (plan.viewport.width, plan.viewport.height);

        let encoder_spec = EncoderSpec { fps: job.payload.fps, viewport: viewport_dims, output: output_dims, threads: self.threads_per_job(), config: &self.config };
        let mut encoder = match Encoder::spawn(scratch.join("video.mp4"), &encoder_spec).await {
            Ok(e) => e,
            Err(e) => {
                ctx.close().await;
                return Err(e);
            }
        };

        let cancellation = CancellationFlag::new();
        let watcher = spawn_cancel_watcher(scheduler.clone(), job_id.clone(), cancellation.clone());

        let frame_loop_config = FrameLoopConfig { fps: job.payload.fps, duration_secs: job.payload.duration, frame_deadline: self.config.frame_timeout };
        let mut sink = EncoderSink { encoder: &mut encoder };
        let mut progress_sink = ExportProgressSink { scheduler: scheduler.clone(), job_id: job_id.clone(), last_update: Instant::now(), interval: self.config.progress_log_interval };

        let frame_result = autoclip_browser::run_frame_loop(&ctx, &cancellation, &frame_loop_config, &mut sink, &mut progress_sink).await;
        watcher.abort();
        ctx.close().await;

        if let Err(e) = frame_result {
            encoder.kill().await;
            return Err(classify_browser_error(e));
        }

        scheduler.with_job_mut(job_id, |j| j.set_status(autoclip_models::JobStatus::Encoding)).await.ok();
        scheduler.with_job_mut(job_id, |j| j.set_progress("encoding", 0.93)).await.ok();

        let silent_video = encoder.finish().await?;

        let timeline: Option<TimelineSnapshot> = match serde_json::from_value(job.payload.state.clone()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("export job {job_id} carried a state payload that doesn't parse as a timeline ({e}); exporting video-only");
                None
            }
        };

        let audio_mix = match timeline {
            Some(snapshot) => build_audio_mix(&scratch, &snapshot, job.payload.duration).await?,
            None => None,
        };

        scheduler.with_job_mut(job_id, |j| j.set_progress("mux", 0.95)).await.ok();

        let final_path = match audio_mix {
            Some(wav_path) => mux_final(&silent_video, &wav_path, &scratch, &self.config.audio_bitrate).await?,
            None => silent_video,
        };

        scheduler.with_job_mut(job_id, |j| j.set_status(autoclip_models::JobStatus::Uploading)).await.ok();
        scheduler.with_job_mut(job_id, |j| j.set_progress("uploading", 0.97)).await.ok();

        let download_url = self.storage.publish_export(&self.config.export_bucket, job_id, &final_path).await.map_err(|e| WorkerError::StorageFailure(e.to_string()))?;

        Ok(download_url)
    }
}

#[async_trait]
impl JobExecutor<ExportJob> for ExportExecutor {
    async fn execute(&self, job_id: JobId) {
        info!("starting export job {job_id}");
        let scheduler = self.scheduler();

        let Some(job) = scheduler.get(&job_id).await else {
            warn!("export job {job_id} disappeared before execution");
            return;
        };

        match self.run(&job_id, &job).await {
            Ok(download_url) => {
                let _ = scheduler.with_job_mut(&job_id, |j| j.complete(download_url)).await;
                info!("export job {job_id} complete");
            }
            Err(e) => {
                warn!("export job {job_id} failed: {e}");
                let _ = scheduler.with_job_mut(&job_id, |j| j.fail(e.to_string())).await;
            }
        }
    }
}

/// Map a browser-layer error onto the worker error taxonomy; disconnect and
/// crash classes become `RENDERER_UNAVAILABLE` (§7).
fn classify_browser_error(err: BrowserError) -> WorkerError {
    match err {
        BrowserError::Cancelled => WorkerError::Cancelled,
        BrowserError::RendererClosed(_) | BrowserError::EncoderExited | BrowserError::SpawnFailed { .. } | BrowserError::LaunchTimeout(_) => WorkerError::RendererUnavailable(err.to_string()),
        BrowserError::Timeout { step, elapsed_secs } => WorkerError::timeout(step, elapsed_secs),
        other => WorkerError::Browser(other),
    }
}

/// Mux the silent encoder output with the mixed audio track: stream-copy
/// video, re-encode audio to AAC at the configured bitrate, fast-start
/// (§4.5.7).
async fn mux_final(video_path: &std::path::Path, audio_path: &std::path::Path, scratch: &ScratchDir, audio_bitrate: &str) -> WorkerResult<std::path::PathBuf> {
    let output = scratch.join("final.mp4");
    let args = vec![
        "-y".to_string(),
        "-i".to_string(),
        video_path.to_string_lossy().to_string(),
        "-i".to_string(),
        audio_path.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        audio_bitrate.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-shortest".to_string(),
        output.to_string_lossy().to_string(),
    ];

    let result = run_process("mux", "ffmpeg", &args, Some(Duration::from_secs(120))).await.map_err(WorkerError::from)?;
    if !result.success {
        return Err(WorkerError::dependency_failure(format!("mux failed: {}", result.stderr_tail)));
    }
    Ok(output)
}

/// Poll for a scheduler-side cancel request and flip the sticky flag the
/// frame loop checks at every suspension point.
fn spawn_cancel_watcher(scheduler: Arc<ExportScheduler>, job_id: JobId, flag: CancellationFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
            match scheduler.get(&job_id).await {
                Some(job) if job.status.is_terminal() => break,
                Some(job) if job.cancel_requested => {
                    flag.cancel();
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
    })
}

struct EncoderSink<'a> {
    encoder: &'a mut Encoder,
}

impl<'a> FrameSink for EncoderSink<'a> {
    fn write_frame(&mut self, _index: u32, bytes: Vec<u8>) -> impl std::future::Future<Output = autoclip_browser::BrowserResult<bool>> + Send {
        async move { Ok(self.encoder.write_frame(&bytes).await) }
    }
}

struct ExportProgressSink {
    scheduler: Arc<ExportScheduler>,
    job_id: JobId,
    last_update: Instant,
    interval: Duration,
}

impl ProgressSink for ExportProgressSink {
    fn on_frame(&mut self, frames_rendered: u32, frames_total: u32) {
        let now = Instant::now();
        let is_last = frames_rendered >= frames_total;
        if !is_last && now.duration_since(self.last_update) < self.interval {
            return;
        }
        self.last_update = now;

        let progress = 0.05 + (frames_rendered as f64 / frames_total.max(1) as f64) * 0.85;
        let scheduler = self.scheduler.clone();
        let job_id = self.job_id.clone();
        tokio::spawn(async move {
            let _ = scheduler
                .with_job_mut(&job_id, |j| {
                    j.set_frames_rendered(frames_rendered as u64);
                    j.set_progress("rendering", progress);
                })
                .await;
        });
    }
}
