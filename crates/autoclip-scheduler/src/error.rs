//! Scheduler error types.

use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("a live or matching job already exists for this session: {0}")]
    DuplicateEnqueue(String),

    #[error("scheduler is at capacity")]
    AtCapacity,
}

impl SchedulerError {
    pub fn job_not_found(id: impl std::fmt::Display) -> Self {
        Self::JobNotFound(id.to_string())
    }
}
