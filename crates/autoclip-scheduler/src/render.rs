//! Render-pipeline admission (§4.6, §5): clip rendering is synchronous from
//! the caller's point of view, so there is no job queue here — just a
//! semaphore bounded by `maxRenderConcurrency`. A request that can't
//! immediately acquire a slot is rejected as busy rather than queued.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct RenderAdmission {
    semaphore: Arc<Semaphore>,
    max_concurrency: u32,
}

impl RenderAdmission {
    pub fn new(max_concurrency: u32) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self { semaphore: Arc::new(Semaphore::new(max_concurrency as usize)), max_concurrency }
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    pub fn active_count(&self) -> u32 {
        self.max_concurrency - self.semaphore.available_permits() as u32
    }

    /// Try to admit a render request. `None` means the pipeline is at
    /// capacity and the caller should respond 429 ("busy").
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_at_capacity() {
        let admission = RenderAdmission::new(1);
        let permit = admission.try_acquire();
        assert!(permit.is_some());
        assert!(admission.try_acquire().is_none());
        drop(permit);
        assert!(admission.try_acquire().is_some());
    }
}
