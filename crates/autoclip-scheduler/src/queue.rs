//! The generic bounded FIFO queue behind both the export and transcribe
//! queues (§4.7): a job table, a FIFO of pending ids, a concurrency
//! semaphore, and a non-re-entrant drain loop that dispatches to a
//! caller-supplied [`JobExecutor`].

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use autoclip_models::JobId;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::executor::JobExecutor;
use crate::job_trait::SchedulableJob;

/// A bounded FIFO queue of jobs of type `J`, dispatched to an executor under
/// a concurrency cap. Safe to share via `Arc` and call from multiple tasks;
/// `drain` guards itself against concurrent re-entry.
pub struct JobQueue<J: SchedulableJob + Send + 'static> {
    jobs: Arc<Mutex<HashMap<JobId, J>>>,
    fifo: Mutex<VecDeque<JobId>>,
    in_flight: Arc<Semaphore>,
    max_concurrency: u32,
    draining: AtomicBool,
    executor: Arc<dyn JobExecutor<J>>,
}

impl<J: SchedulableJob + Send + 'static> JobQueue<J> {
    pub fn new(max_concurrency: u32, executor: Arc<dyn JobExecutor<J>>) -> Arc<Self> {
        Arc::new(Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            fifo: Mutex::new(VecDeque::new()),
            in_flight: Arc::new(Semaphore::new(max_concurrency.max(1) as usize)),
            max_concurrency: max_concurrency.max(1),
            draining: AtomicBool::new(false),
            executor,
        })
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    pub async fn active_count(&self) -> u32 {
        self.max_concurrency - self.in_flight.available_permits() as u32
    }

    pub async fn queued_count(&self) -> usize {
        self.fifo.lock().await.len()
    }

    /// Position (1-based) of `job_id` in the pending FIFO, or 0 if it is
    /// already dispatched or unknown.
    pub async fn queue_position(&self, job_id: &JobId) -> usize {
        self.fifo.lock().await.iter().position(|id| id == job_id).map(|i| i + 1).unwrap_or(0)
    }

    /// Insert `job` and append its id to the FIFO, then kick the drain loop.
    pub async fn enqueue(self: &Arc<Self>, job: J) -> JobId {
        let id = job.id().clone();
        self.jobs.lock().await.insert(id.clone(), job);
        self.fifo.lock().await.push_back(id.clone());
        debug!("enqueued job {id}");

        self.spawn_drain();
        id
    }

    /// Re-queue an already-known job id at the back of the FIFO (transient
    /// retry, §4.7). The caller is responsible for having already reset the
    /// job's own status/retry-count fields.
    pub async fn requeue(self: &Arc<Self>, job_id: JobId) {
        self.fifo.lock().await.push_back(job_id);
        self.spawn_drain();
    }

    pub async fn get(&self, job_id: &JobId) -> Option<J>
    where
        J: Clone,
    {
        self.jobs.lock().await.get(job_id).cloned()
    }

    pub async fn with_job_mut<R>(&self, job_id: &JobId, f: impl FnOnce(&mut J) -> R) -> SchedulerResult<R> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| SchedulerError::job_not_found(job_id))?;
        Ok(f(job))
    }

    /// Delete jobs whose terminal status is older than `retention`. Returns
    /// the ids removed so callers can clean up any secondary index (§4.7's
    /// session→job index).
    pub async fn evict_expired(&self, retention: std::time::Duration) -> Vec<JobId> {
        let now = chrono::Utc::now();
        let mut jobs = self.jobs.lock().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.status().is_terminal() && now.signed_duration_since(job.updated_at()).to_std().map(|age| age >= retention).unwrap_or(false))
            .map(|job| job.id().clone())
            .collect();

        for id in &expired {
            jobs.remove(id);
        }
        expired
    }

    /// Non-re-entrant: while under the concurrency cap and the queue is
    /// non-empty, pop the next id, mark it `processing`, and spawn its
    /// pipeline. Safe to call from many places (enqueue, job completion,
    /// periodic sweep) concurrently — only one copy actually runs the pop
    /// loop at a time, and a concurrent caller's wakeup is not lost because
    /// whichever instance is draining re-checks the queue before exiting.
    pub fn drain(self: &Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.draining.swap(true, Ordering::SeqCst) {
                return;
            }

            loop {
                let permit = match self.in_flight.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                let next_id = self.fifo.lock().await.pop_front();
                let Some(job_id) = next_id else {
                    drop(permit);
                    break;
                };

                let marked = self.with_job_mut(&job_id, |job| job.mark_processing()).await;
                if marked.is_err() {
                    warn!("drained job {job_id} vanished from the job table before dispatch");
                    drop(permit);
                    continue;
                }

                let executor = self.executor.clone();
                let queue = self.clone();
                tokio::spawn(async move {
                    executor.execute(job_id.clone()).await;
                    drop(permit);
                    debug!("job {job_id} pipeline finished, re-draining");
                    queue.drain().await;
                });
            }

            self.draining.store(false, Ordering::SeqCst);
        })
    }

    fn spawn_drain(self: &Arc<Self>) {
        let queue = self.clone();
        tokio::spawn(async move { queue.drain().await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclip_models::{Dimensions, ExportJob, ExportPayload};
    use std::sync::atomic::AtomicU32;

    fn payload() -> ExportPayload {
        ExportPayload {
            state: serde_json::json!({}),
            output: Dimensions { width: 1080, height: 1920 },
            preview: None,
            fps: 30.0,
            duration: 1.0,
            fonts: vec![],
            name: None,
            requested_by: None,
            render_url: None,
        }
    }

    struct CountingExecutor {
        ran: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl JobExecutor<ExportJob> for CountingExecutor {
        async fn execute(&self, _job_id: JobId) {
            self.ran.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn drain_dispatches_every_queued_job_exactly_once() {
        let ran = Arc::new(AtomicU32::new(0));
        let executor = Arc::new(CountingExecutor { ran: ran.clone() });
        let queue = JobQueue::new(2, executor);

        for _ in 0..3 {
            queue.enqueue(ExportJob::new(payload())).await;
        }

        for _ in 0..50 {
            if ran.load(Ordering::SeqCst) == 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(queue.queued_count().await, 0);
    }

    #[tokio::test]
    async fn queue_position_reflects_fifo_order() {
        let ran = Arc::new(AtomicU32::new(0));
        let executor = Arc::new(CountingExecutor { ran });
        let queue = JobQueue::new(1, executor);

        let job_a = ExportJob::new(payload());
        let job_b = ExportJob::new(payload());
        let id_a = job_a.id.clone();
        let id_b = job_b.id.clone();
        queue.jobs.lock().await.insert(id_a.clone(), job_a);
        queue.jobs.lock().await.insert(id_b.clone(), job_b);
        queue.fifo.lock().await.push_back(id_a.clone());
        queue.fifo.lock().await.push_back(id_b.clone());

        assert_eq!(queue.queue_position(&id_a).await, 1);
        assert_eq!(queue.queue_position(&id_b).await, 2);
    }
}
