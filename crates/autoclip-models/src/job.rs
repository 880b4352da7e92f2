//! ExportJob / TranscribeJob state and the shared status enum driven solely by
//! the scheduler's worker task for that job.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, SessionId, Transcript};

/// Status shared by both job kinds. Not every variant is reachable by both:
/// `loading`/`rendering`/`encoding`/`uploading` are export-only stages, but the
/// type is shared because both job kinds follow the same `queued → ... →
/// complete|error` shape and are driven by the same scheduler machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Loading,
    Processing,
    Rendering,
    Encoding,
    Uploading,
    Complete,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error | JobStatus::Cancelled)
    }

    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }
}

/// Output dimensions for an editor export, rounded down to even integers by
/// the pipeline before use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// The opaque render payload carried by an export job: editor state plus
/// output/preview geometry and timing. `state` and `fonts` are passed through
/// to the renderer verbatim; this core never interprets their contents beyond
/// what §4.5 needs (the timeline snapshot for the audio mix).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportPayload {
    pub state: serde_json::Value,
    pub output: Dimensions,
    #[serde(default)]
    pub preview: Option<Dimensions>,
    #[serde(default = "default_fps")]
    pub fps: f64,
    pub duration: f64,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub render_url: Option<String>,
}

fn default_fps() -> f64 {
    30.0
}

/// A queued or in-flight editor export. Mutated only by the scheduler's
/// worker task for this job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportJob {
    pub id: JobId,
    pub status: JobStatus,
    pub stage: String,
    /// Monotonic non-decreasing within a job's lifetime, in `[0, 1]`.
    pub progress: f64,
    pub frames_total: u64,
    pub frames_rendered: u64,
    pub payload: ExportPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once a cancel request lands; the frame loop checks this at every
    /// suspension point and aborts if set (see §9's cancellation extension).
    #[serde(skip)]
    pub cancel_requested: bool,
}

impl ExportJob {
    pub fn new(payload: ExportPayload) -> Self {
        let now = Utc::now();
        let frames_total = (payload.duration * payload.fps).ceil().max(0.0) as u64;
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            stage: "queued".to_string(),
            progress: 0.0,
            frames_total,
            frames_rendered: 0,
            payload,
            download_url: None,
            error: None,
            created_at: now,
            updated_at: now,
            cancel_requested: false,
        }
    }

    /// Advance progress, clamping to be monotonic non-decreasing per the
    /// invariant in §3.
    pub fn set_progress(&mut self, stage: impl Into<String>, progress: f64) {
        self.stage = stage.into();
        self.progress = progress.max(self.progress).min(1.0);
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_frames_rendered(&mut self, rendered: u64) {
        self.frames_rendered = rendered.min(self.frames_total).max(self.frames_rendered);
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, download_url: impl Into<String>) {
        self.status = JobStatus::Complete;
        self.download_url = Some(download_url.into());
        self.progress = 1.0;
        self.stage = "complete".to_string();
        self.updated_at = Utc::now();
    }
}

/// A queued or in-flight transcription job. At most one live job may exist
/// per session (enforced by the scheduler's `sessionId -> id` index).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscribeJob {
    pub id: JobId,
    pub session_id: SessionId,
    pub video_key: String,
    pub language: Option<String>,
    pub status: JobStatus,
    pub stage: String,
    /// Percentage in `[0, 100]`, matching the RPC job-payload contract (§6).
    pub progress: u8,
    pub total_chunks: u32,
    pub completed_chunks: u32,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Transcript>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranscribeJob {
    pub fn new(session_id: SessionId, video_key: impl Into<String>, language: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            session_id,
            video_key: video_key.into(),
            language,
            status: JobStatus::Queued,
            stage: "queued".to_string(),
            progress: 0,
            total_chunks: 0,
            completed_chunks: 0,
            retry_count: 0,
            error: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether an existing job matches a would-be enqueue with the same
    /// `(videoKey, language)`, per the per-session-uniqueness property (§8):
    /// a live job always matches regardless of fields; a complete job matches
    /// only if the key/language are identical.
    pub fn matches_enqueue(&self, video_key: &str, language: Option<&str>) -> bool {
        if self.status.is_live() {
            return true;
        }
        self.status == JobStatus::Complete
            && self.video_key == video_key
            && self.language.as_deref() == language
    }

    pub fn set_progress(&mut self, stage: impl Into<String>, completed_chunks: u32) {
        self.stage = stage.into();
        self.completed_chunks = completed_chunks;
        if self.total_chunks > 0 {
            self.progress = ((completed_chunks as f64 / self.total_chunks as f64) * 100.0) as u8;
        }
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, result: Transcript) {
        self.status = JobStatus::Complete;
        self.progress = 100;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }

    pub fn requeue_for_retry(&mut self) {
        self.status = JobStatus::Queued;
        self.stage = "queued".to_string();
        self.retry_count += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ExportPayload {
        ExportPayload {
            state: serde_json::json!({}),
            output: Dimensions { width: 1080, height: 1920 },
            preview: None,
            fps: 30.0,
            duration: 3.0,
            fonts: vec![],
            name: None,
            requested_by: None,
            render_url: None,
        }
    }

    #[test]
    fn frames_total_is_duration_times_fps_ceiled() {
        let job = ExportJob::new(payload());
        assert_eq!(job.frames_total, 90);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = ExportJob::new(payload());
        job.set_progress("rendering", 0.5);
        job.set_progress("rendering", 0.3);
        assert_eq!(job.progress, 0.5);
    }

    #[test]
    fn transcribe_job_dedup_matches_live_job_regardless_of_fields() {
        let job = TranscribeJob::new(SessionId::new(), "a.mp4", None);
        assert!(job.matches_enqueue("different.mp4", Some("fr")));
    }

    #[test]
    fn transcribe_job_dedup_matches_complete_job_only_with_same_key_and_language() {
        let mut job = TranscribeJob::new(SessionId::new(), "a.mp4", Some("en".into()));
        job.complete(Transcript::new());
        assert!(job.matches_enqueue("a.mp4", Some("en")));
        assert!(!job.matches_enqueue("a.mp4", Some("fr")));
        assert!(!job.matches_enqueue("b.mp4", Some("en")));
    }
}
