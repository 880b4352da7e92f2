//! Client for the external speech-to-text endpoint, implementing the
//! connection-aware retry classification and decode-error WAV fallback from
//! §4.4.3.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SttClient, SttConfig};
pub use error::{SttError, SttResult};
pub use types::SegmentTranscription;
