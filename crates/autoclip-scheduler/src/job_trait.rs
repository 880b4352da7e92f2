//! A minimal trait the generic [`crate::queue::JobQueue`] needs from any job
//! it schedules. The actual state machine (status transitions, progress,
//! completion) lives on the concrete job types in `autoclip-models`; this
//! trait only exposes what the queue needs to admit, dispatch, and expire a
//! job without knowing its shape.

use autoclip_models::{JobId, JobStatus};

pub trait SchedulableJob {
    fn id(&self) -> &JobId;
    fn status(&self) -> JobStatus;
    fn mark_processing(&mut self);
    fn updated_at(&self) -> chrono::DateTime<chrono::Utc>;
}

impl SchedulableJob for autoclip_models::ExportJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    fn status(&self) -> JobStatus {
        self.status
    }

    fn mark_processing(&mut self) {
        self.set_status(JobStatus::Processing);
    }

    fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.updated_at
    }
}

impl SchedulableJob for autoclip_models::TranscribeJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    fn status(&self) -> JobStatus {
        self.status
    }

    fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = chrono::Utc::now();
    }

    fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.updated_at
    }
}
