//! Axum HTTP API server.
//!
//! This crate exposes the authenticated RPC surface described in the
//! system's external interface: video ingest, transcription, clip
//! rendering and editor-export, all backed by the schedulers and workers
//! in the sibling crates.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
