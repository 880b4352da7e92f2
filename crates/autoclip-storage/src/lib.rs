//! Object storage adapter (§4.2): upload/download/sign/list/remove against
//! Supabase Storage's S3-compatible endpoint, plus the session/export path
//! layout from §6.

pub mod client;
pub mod error;
pub mod operations;

pub use client::{ObjectInfo, StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use operations::{clip_key, export_key, input_key, preview_key};
