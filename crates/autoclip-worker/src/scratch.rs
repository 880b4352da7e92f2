//! Per-job scratch directory management under the temp root. Each job owns a
//! uniquely-prefixed subdirectory for the lifetime of its pipeline run;
//! cleanup is best-effort on every exit path, matching the ownership
//! invariant (no cross-job file access, §3).

use std::path::{Path, PathBuf};

use tracing::warn;

fn temp_root() -> PathBuf {
    PathBuf::from(std::env::var("TEMP_DIR").unwrap_or_else(|_| "/tmp/autoclip".to_string()))
}

/// A scratch directory owned by one job. Removed from disk when dropped.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh scratch directory for `job_id` under the configured
    /// temp root, scoped by `kind` (e.g. "transcribe", "export", "render").
    pub async fn create(kind: &str, job_id: &str) -> std::io::Result<Self> {
        let path = temp_root().join(kind).join(job_id);
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let path = self.path.clone();
        if let Err(e) = std::fs::remove_dir_all(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove scratch dir {}: {e}", path.display());
            }
        }
    }
}

/// Sweep stale scratch subdirectories left behind by a prior process
/// instance (crash, kill -9). Runs once at startup; never fails the boot.
pub async fn sweep_stale_scratch() {
    let root = temp_root();
    let mut kinds = match tokio::fs::read_dir(&root).await {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut removed = 0u32;
    while let Ok(Some(kind_entry)) = kinds.next_entry().await {
        if !kind_entry.path().is_dir() {
            continue;
        }
        let Ok(mut jobs) = tokio::fs::read_dir(kind_entry.path()).await else { continue };
        while let Ok(Some(job_entry)) = jobs.next_entry().await {
            if tokio::fs::remove_dir_all(job_entry.path()).await.is_ok() {
                removed += 1;
            }
        }
    }

    if removed > 0 {
        tracing::info!("startup scratch sweep removed {removed} stale job directories under {}", root.display());
    }
}
