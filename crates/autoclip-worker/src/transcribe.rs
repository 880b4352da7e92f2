//! Transcription pipeline (§4.4): download the source, extract and segment
//! its audio, transcribe each segment in order with offset-accumulated
//! merging, and report the outcome to the scheduler for retry-or-terminate.

use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use autoclip_models::{JobId, Transcript};
use autoclip_scheduler::{JobExecutor, PipelineOutcome, TranscribeScheduler};
use autoclip_storage::StorageClient;
use autoclip_stt::SttClient;
use tracing::{info, warn};

use crate::config::TranscribeConfig;
use crate::error::WorkerError;
use crate::scratch::ScratchDir;

/// Implements `JobExecutor<TranscribeJob>`, driving one job's audio pipeline
/// end to end. Holds a weak back-reference to the scheduler it's registered
/// with, bound once the scheduler exists (the two are mutually dependent at
/// construction time).
pub struct TranscribeExecutor {
    scheduler: OnceLock<Weak<TranscribeScheduler>>,
    stt: Arc<SttClient>,
    storage: Arc<StorageClient>,
    config: TranscribeConfig,
}

impl TranscribeExecutor {
    pub fn new(stt: Arc<SttClient>, storage: Arc<StorageClient>, config: TranscribeConfig) -> Arc<Self> {
        Arc::new(Self { scheduler: OnceLock::new(), stt, storage, config })
    }

    /// Wire the executor back to its scheduler. Must be called once, before
    /// any job reaches `execute`.
    pub fn bind_scheduler(&self, scheduler: &Arc<TranscribeScheduler>) {
        let _ = self.scheduler.set(Arc::downgrade(scheduler));
    }

    fn scheduler(&self) -> Arc<TranscribeScheduler> {
        self.scheduler.get().and_then(Weak::upgrade).expect("scheduler bound before jobs execute")
    }

    async fn run(&self, job_id: &JobId) -> Result<Transcript, PipelineOutcome> {
        let scheduler = self.scheduler();
        let job = scheduler.get(job_id).await.ok_or_else(|| PipelineOutcome::TerminalFailure("job disappeared before execution".to_string()))?;

        let scratch = ScratchDir::create("transcribe", job_id.as_str()).await.map_err(|e| PipelineOutcome::TerminalFailure(format!("failed to create scratch dir: {e}")))?;

        let input_path = scratch.join("input.mp4");
        self.storage.download(&self.config.bucket, &job.video_key, &input_path).await.map_err(|e| PipelineOutcome::TerminalFailure(format!("download failed: {e}")))?;

        let audio_path = autoclip_media::extract_normalized_audio(&input_path, scratch.join("audio"), &self.config.bitrate)
            .await
            .map_err(|e| PipelineOutcome::TerminalFailure(format!("audio extraction failed: {e}")))?;

        let segment_seconds = self.config.chunk_seconds.max(1.0) as u32;
        let segments = autoclip_media::segment_audio(&audio_path, scratch.join("segments"), segment_seconds)
            .await
            .map_err(|e| PipelineOutcome::TerminalFailure(format!("segmentation failed: {e}")))?;

        let _ = scheduler.with_job_mut(job_id, |j| j.total_chunks = segments.len() as u32).await;

        let mut transcript = Transcript::new();
        let mut offset_seconds = 0.0f64;
        let mut succeeded = 0u32;

        for (index, segment_path) in segments.iter().enumerate() {
            let segment_duration = autoclip_media::get_duration(segment_path).await.ok().flatten().unwrap_or(0.0);

            match self.stt.transcribe_segment(segment_path, scratch.join("decode_fallback"), job.language.as_deref()).await {
                Ok(result) => {
                    transcript.merge_segment(offset_seconds, result.segments, result.words, &result.text, result.language.as_deref());
                    succeeded += 1;
                    let _ = scheduler.with_job_mut(job_id, |j| j.set_progress("transcribing".to_string(), index as u32 + 1)).await;
                }
                Err(err) => {
                    let worker_err: WorkerError = err.into();
                    if succeeded > 0 {
                        warn!("segment {index} of job {job_id} failed after earlier segments succeeded, skipping: {worker_err}");
                    } else if worker_err.is_transient() {
                        return Err(PipelineOutcome::TransientFailure(worker_err.to_string()));
                    } else {
                        return Err(PipelineOutcome::TerminalFailure(worker_err.to_string()));
                    }
                }
            }

            offset_seconds += segment_duration;
        }

        if succeeded == 0 {
            return Err(PipelineOutcome::TerminalFailure("no segment succeeded".to_string()));
        }

        Ok(transcript)
    }
}

#[async_trait]
impl JobExecutor<autoclip_models::TranscribeJob> for TranscribeExecutor {
    async fn execute(&self, job_id: JobId) {
        info!("starting transcription job {job_id}");
        let scheduler = self.scheduler();

        match self.run(&job_id).await {
            Ok(transcript) => {
                let _ = scheduler.with_job_mut(&job_id, |j| j.complete(transcript)).await;
                scheduler.apply_outcome(&job_id, PipelineOutcome::Success).await;
                info!("transcription job {job_id} complete");
            }
            Err(outcome) => {
                scheduler.apply_outcome(&job_id, outcome).await;
            }
        }
    }
}
