//! Queue-specific wrappers around [`crate::queue::JobQueue`]: the export
//! queue as a thin facade, and the transcribe queue with its extra
//! session→job dedup index and transient-retry policy (§4.7).

use std::collections::HashMap;
use std::sync::Arc;

use autoclip_models::{ExportJob, ExportPayload, JobId, SessionId, TranscribeJob};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Snapshot used to populate the RPC response shapes in §6
/// (`queuePosition`, `activeExports`, `maxConcurrency`, ...).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub active: u32,
    pub queued: usize,
    pub max_concurrency: u32,
}

pub struct ExportScheduler {
    queue: Arc<JobQueue<ExportJob>>,
}

impl ExportScheduler {
    pub fn new(max_concurrency: u32, executor: Arc<dyn JobExecutor<ExportJob>>) -> Self {
        Self { queue: JobQueue::new(max_concurrency, executor) }
    }

    pub async fn enqueue(&self, payload: ExportPayload) -> (JobId, QueueStats) {
        let job = ExportJob::new(payload);
        let id = job.id.clone();
        self.queue.enqueue(job).await;
        let stats = self.stats_for(&id).await;
        (id, stats)
    }

    pub async fn get(&self, job_id: &JobId) -> Option<ExportJob> {
        self.queue.get(job_id).await
    }

    pub async fn with_job_mut<R>(&self, job_id: &JobId, f: impl FnOnce(&mut ExportJob) -> R) -> crate::error::SchedulerResult<R> {
        self.queue.with_job_mut(job_id, f).await
    }

    pub async fn request_cancel(&self, job_id: &JobId) -> crate::error::SchedulerResult<()> {
        self.queue.with_job_mut(job_id, |job| job.cancel_requested = true).await
    }

    pub async fn stats_for(&self, job_id: &JobId) -> QueueStats {
        QueueStats { active: self.queue.active_count().await, queued: self.queue.queue_position(job_id).await, max_concurrency: self.queue.max_concurrency() }
    }

    pub async fn global_stats(&self) -> QueueStats {
        QueueStats { active: self.queue.active_count().await, queued: self.queue.queued_count().await, max_concurrency: self.queue.max_concurrency() }
    }

    pub async fn evict_expired(&self, retention: std::time::Duration) -> Vec<JobId> {
        self.queue.evict_expired(retention).await
    }
}

pub struct TranscribeScheduler {
    queue: Arc<JobQueue<TranscribeJob>>,
    session_index: Mutex<HashMap<SessionId, JobId>>,
    config: SchedulerConfig,
}

/// Outcome of a pipeline attempt, used to decide between a transient retry
/// and a terminal failure (§4.7).
pub enum PipelineOutcome {
    Success,
    TransientFailure(String),
    TerminalFailure(String),
}

impl TranscribeScheduler {
    pub fn new(config: SchedulerConfig, executor: Arc<dyn JobExecutor<TranscribeJob>>) -> Self {
        Self { queue: JobQueue::new(config.transcribe_concurrency, executor), session_index: Mutex::new(HashMap::new()), config }
    }

    /// Enqueue a transcription unless a live or matching-complete job
    /// already exists for this session (§3/§8 per-session-uniqueness).
    /// Returns the existing job's id when deduped.
    pub async fn enqueue_or_dedup(&self, session_id: SessionId, video_key: impl Into<String>, language: Option<String>) -> (JobId, bool) {
        let video_key = video_key.into();

        let mut index = self.session_index.lock().await;
        if let Some(existing_id) = index.get(&session_id) {
            if let Some(existing) = self.queue.get(existing_id).await {
                if existing.matches_enqueue(&video_key, language.as_deref()) {
                    return (existing_id.clone(), true);
                }
            }
        }

        let job = TranscribeJob::new(session_id.clone(), video_key, language);
        let id = job.id.clone();
        index.insert(session_id, id.clone());
        drop(index);

        self.queue.enqueue(job).await;
        (id, false)
    }

    pub async fn get(&self, job_id: &JobId) -> Option<TranscribeJob> {
        self.queue.get(job_id).await
    }

    pub async fn get_by_session(&self, session_id: &SessionId) -> Option<TranscribeJob> {
        let job_id = self.session_index.lock().await.get(session_id).cloned()?;
        self.queue.get(&job_id).await
    }

    pub async fn with_job_mut<R>(&self, job_id: &JobId, f: impl FnOnce(&mut TranscribeJob) -> R) -> crate::error::SchedulerResult<R> {
        self.queue.with_job_mut(job_id, f).await
    }

    /// Apply a pipeline's outcome to the job, requeuing with backoff on a
    /// transient connection-class failure under the retry limit (§4.7).
    pub async fn apply_outcome(&self, job_id: &JobId, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Success => {}
            PipelineOutcome::TerminalFailure(error) => {
                let _ = self.queue.with_job_mut(job_id, |job| job.fail(error)).await;
            }
            PipelineOutcome::TransientFailure(error) => {
                let retry_count = self.queue.get(job_id).await.map(|job| job.retry_count).unwrap_or(u32::MAX);
                if retry_count < self.config.transient_retry_limit {
                    let delay = self.config.transient_retry_delay(retry_count);
                    info!("transcription job {job_id} hit a transient error ({error}), retrying in {delay:?}");
                    let _ = self.queue.with_job_mut(job_id, |job| job.requeue_for_retry()).await;
                    let queue = self.queue.clone();
                    let job_id = job_id.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        queue.requeue(job_id).await;
                    });
                } else {
                    warn!("transcription job {job_id} exhausted its transient retry budget ({retry_count} attempts)");
                    let _ = self.queue.with_job_mut(job_id, |job| job.fail(error)).await;
                }
            }
        }
    }

    pub async fn stats_for(&self, job_id: &JobId) -> QueueStats {
        QueueStats { active: self.queue.active_count().await, queued: self.queue.queue_position(job_id).await, max_concurrency: self.queue.max_concurrency() }
    }

    pub async fn global_stats(&self) -> QueueStats {
        QueueStats { active: self.queue.active_count().await, queued: self.queue.queued_count().await, max_concurrency: self.queue.max_concurrency() }
    }

    /// Delete expired terminal jobs and drop their session-index entries
    /// (§4.7 job TTL).
    pub async fn evict_expired(&self) {
        let expired = self.queue.evict_expired(self.config.job_retention).await;
        if expired.is_empty() {
            return;
        }
        let mut index = self.session_index.lock().await;
        index.retain(|_, id| !expired.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl JobExecutor<TranscribeJob> for NoopExecutor {
        async fn execute(&self, _job_id: JobId) {}
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            export_concurrency: 1,
            transcribe_concurrency: 1,
            render_concurrency: 1,
            job_retention: std::time::Duration::from_secs(3600),
            transient_retry_limit: 2,
            transient_retry_base_delay: std::time::Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn enqueue_or_dedup_returns_the_same_id_for_a_live_session() {
        let scheduler = TranscribeScheduler::new(config(), Arc::new(NoopExecutor));
        let session = SessionId::new();
        let (first_id, first_deduped) = scheduler.enqueue_or_dedup(session.clone(), "a.mp4", None).await;
        assert!(!first_deduped);

        let (second_id, second_deduped) = scheduler.enqueue_or_dedup(session, "different.mp4", Some("fr".into())).await;
        assert!(second_deduped);
        assert_eq!(first_id, second_id);
    }

    #[tokio::test]
    async fn apply_outcome_retries_transient_failures_under_the_limit() {
        let scheduler = TranscribeScheduler::new(config(), Arc::new(NoopExecutor));
        let (job_id, _) = scheduler.enqueue_or_dedup(SessionId::new(), "a.mp4", None).await;

        scheduler.apply_outcome(&job_id, PipelineOutcome::TransientFailure("connection reset".into())).await;
        let job = scheduler.get(&job_id).await.unwrap();
        assert_eq!(job.retry_count, 1);
        assert_eq!(job.status, autoclip_models::JobStatus::Queued);
    }

    #[tokio::test]
    async fn apply_outcome_fails_terminally_once_the_retry_budget_is_exhausted() {
        let scheduler = TranscribeScheduler::new(config(), Arc::new(NoopExecutor));
        let (job_id, _) = scheduler.enqueue_or_dedup(SessionId::new(), "a.mp4", None).await;

        for _ in 0..3 {
            scheduler.apply_outcome(&job_id, PipelineOutcome::TransientFailure("connection reset".into())).await;
        }
        let job = scheduler.get(&job_id).await.unwrap();
        assert_eq!(job.status, autoclip_models::JobStatus::Error);
    }
}
