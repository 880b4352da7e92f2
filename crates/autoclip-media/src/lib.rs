#![deny(unreachable_patterns)]
//! External-tool wrappers for the video processing core:
//! - Bounded-tail process spawning with explicit deadlines (§4.1)
//! - FFmpeg command building, progress parsing, and cancellation
//! - Media probe (ffprobe JSON, never panics on missing fields) (§4.3)
//! - Remote-download ingest via yt-dlp
//! - Normalized audio extraction and segmentation for transcription (§4.4)
//! - The render pipeline (clip extract → face-crop → scale+mux) (§4.6)

pub mod audio;
pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod face_crop;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use audio::{extract_normalized_audio, segment_audio, transcode_to_wav_fallback};
pub use clip::{create_clip, RenderEncoding};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, run_process, FfmpegCommand, FfmpegRunner, ProcessOutput};
pub use download::{download_video, extract_youtube_id, is_supported_url};
pub use error::{MediaError, MediaResult};
pub use face_crop::{run_face_crop, FaceCropMode};
pub use fs_utils::move_file;
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
