//! Object-store layout helpers (§6): session artifacts, editor exports, and
//! session cleanup built on top of the generic `StorageClient` operations.

use std::path::Path;
use std::time::Duration;

use autoclip_models::{JobId, SessionId};
use tracing::info;

use crate::client::StorageClient;
use crate::error::StorageResult;

/// Key for a session's source video.
pub fn input_key(session_id: &SessionId) -> String {
    format!("sessions/{session_id}/input.mp4")
}

/// Key for a rendered clip under a session.
pub fn clip_key(session_id: &SessionId, filename: &str) -> String {
    format!("sessions/{session_id}/clips/{filename}")
}

/// Key for a `[start, end]` preview render under a session.
pub fn preview_key(session_id: &SessionId, start: f64, end: f64) -> String {
    format!("sessions/{session_id}/preview_{start}_{end}.mp4")
}

/// Key for a finished editor export.
pub fn export_key(job_id: &JobId) -> String {
    format!("exports/{job_id}/export.mp4")
}

impl StorageClient {
    /// Upload the ingested source video for a session.
    pub async fn upload_session_video(&self, bucket: &str, session_id: &SessionId, local_path: impl AsRef<Path>) -> StorageResult<String> {
        let key = input_key(session_id);
        self.upload(bucket, &key, local_path, "video/mp4").await?;
        Ok(key)
    }

    /// Upload a rendered clip for a session, returning its key.
    pub async fn upload_clip(&self, bucket: &str, session_id: &SessionId, filename: &str, local_path: impl AsRef<Path>) -> StorageResult<String> {
        let key = clip_key(session_id, filename);
        self.upload(bucket, &key, local_path, "video/mp4").await?;
        Ok(key)
    }

    /// Upload a preview render for a session, returning its key.
    pub async fn upload_preview(&self, bucket: &str, session_id: &SessionId, start: f64, end: f64, local_path: impl AsRef<Path>) -> StorageResult<String> {
        let key = preview_key(session_id, start, end);
        self.upload(bucket, &key, local_path, "video/mp4").await?;
        Ok(key)
    }

    /// Upload a finished editor export, returning a 24-hour signed URL (§4.5.7).
    pub async fn publish_export(&self, export_bucket: &str, job_id: &JobId, local_path: impl AsRef<Path>) -> StorageResult<String> {
        let key = export_key(job_id);
        self.upload(export_bucket, &key, local_path, "video/mp4").await?;
        self.sign(export_bucket, &key, Duration::from_secs(24 * 60 * 60)).await
    }

    /// Remove every object under `sessions/<sessionId>/` in `bucket` (`POST /cleanup`).
    pub async fn cleanup_session(&self, bucket: &str, session_id: &SessionId) -> StorageResult<u32> {
        let prefix = format!("sessions/{session_id}/");
        let objects = self.list(bucket, &prefix, usize::MAX).await?;

        if objects.is_empty() {
            info!("no artifacts found for session {session_id}");
            return Ok(0);
        }

        let keys: Vec<_> = objects.into_iter().map(|o| o.key).collect();
        self.remove(bucket, &keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_object_store_contract() {
        let session = SessionId::from_string("abc".to_string());
        assert_eq!(input_key(&session), "sessions/abc/input.mp4");
        assert_eq!(clip_key(&session, "clip_01.mp4"), "sessions/abc/clips/clip_01.mp4");
        assert_eq!(preview_key(&session, 1.0, 5.0), "sessions/abc/preview_1_5.mp4");

        let job = JobId::from_string("job1".to_string());
        assert_eq!(export_key(&job), "exports/job1/export.mp4");
    }
}
