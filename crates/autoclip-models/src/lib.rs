#![deny(unreachable_patterns)]
//! Shared data model for the video processing core:
//! - Opaque session/job identifiers
//! - Session and ingest metadata
//! - ExportJob / TranscribeJob state machines
//! - Transcript (segments, words) with offset-accumulated merge
//! - TimelineSnapshot (tagged asset/clip graph consumed by the export pipeline)

pub mod clip_range;
pub mod ids;
pub mod job;
pub mod session;
pub mod timeline;
pub mod transcript;

pub use clip_range::{ClipRange, RenderQuality};
pub use ids::{JobId, SessionId};
pub use job::{Dimensions, ExportJob, ExportPayload, JobStatus, TranscribeJob};
pub use session::{Session, VideoMetadata};
pub use timeline::{Asset, AssetKind, Clip, ClipSettings, TimelineSnapshot};
pub use transcript::{Segment, Transcript, Word};
