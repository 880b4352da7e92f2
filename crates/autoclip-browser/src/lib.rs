//! Shared headless-browser lifecycle and frame-loop driver for the editor
//! export pipeline (§4.5.1-4.5.4): a singleton WebDriver process with
//! deduplicated launch, per-job contexts, viewport/scaling mode selection,
//! and the frame-by-frame render driver.

pub mod browser;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod job_context;
pub mod payload;
pub mod viewport;

pub use browser::{BrowserHandle, SharedBrowser};
pub use cancellation::CancellationFlag;
pub use config::BrowserConfig;
pub use error::{BrowserError, BrowserResult};
pub use frame_loop::{run_frame_loop, FrameLoopConfig, FrameSink, ProgressSink};
pub use job_context::JobContext;
pub use payload::build_navigation_url;
pub use viewport::{compute_render_mode, round_down_even, RenderMode, RenderPlan};
