//! The pipeline side of a queue: whatever runs a job to completion once the
//! scheduler admits it. Boxed as a trait object because the worker crate
//! supplies one concrete executor per queue and the scheduler must not
//! depend on `autoclip-worker` (that dependency runs the other way).

use async_trait::async_trait;
use autoclip_models::JobId;

#[async_trait]
pub trait JobExecutor<J>: Send + Sync {
    /// Run the job identified by `job_id` to completion, mutating it in
    /// place through whatever handle the executor holds (typically a clone
    /// of the same `Arc<Mutex<HashMap<JobId, J>>>` the queue owns). Errors
    /// are for observability only; terminal job state is the job's own
    /// `status` field, not this return value.
    async fn execute(&self, job_id: JobId);
}
