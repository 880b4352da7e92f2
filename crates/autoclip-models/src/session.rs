//! Session: the opaque short identifier partitioning scratch and object-store paths.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Metadata captured about a session's source video at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Duration in seconds, `None` if the probe could not determine it.
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// File size in bytes.
    pub size: u64,
}

/// A short-lived session created on ingest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    pub id: SessionId,
    /// Object-store key of the source video, e.g. `sessions/<id>/input.mp4`.
    pub video_key: String,
    pub metadata: VideoMetadata,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(video_key: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            id: SessionId::new(),
            video_key: video_key.into(),
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Object-store key for a rendered clip belonging to this session.
    pub fn clip_key(&self, filename: &str) -> String {
        format!("sessions/{}/clips/{}", self.id, filename)
    }

    /// Object-store key for a preview of a `[start, end]` range.
    pub fn preview_key(&self, start: f64, end: f64) -> String {
        format!("sessions/{}/preview_{}_{}.mp4", self.id, start, end)
    }
}
