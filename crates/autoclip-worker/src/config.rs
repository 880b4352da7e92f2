//! Worker pipeline configuration: render/export/transcription knobs from §6's
//! environment variable catalog, layered the way the teacher's `WorkerConfig`
//! reads `WORKER_*` vars — one `env_*` helper per type, defaults inline.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub face_crop_script: String,
    pub max_fps: f64,
    pub min_height: u32,
    pub bucket: String,
}

impl RenderConfig {
    pub fn from_env() -> Self {
        Self {
            face_crop_script: std::env::var("AUTOCLIP_FACE_CROP_SCRIPT").unwrap_or_else(|_| "face_crop.py".to_string()),
            max_fps: env_f64("AUTOCLIP_RENDER_MAX_FPS", 30.0),
            min_height: env_u32("AUTOCLIP_RENDER_MIN_HEIGHT", 1280),
            bucket: std::env::var("AUTOCLIP_BUCKET").unwrap_or_else(|_| "autoclip".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub fps: f64,
    pub frame_format: FrameFormat,
    pub jpeg_quality: u8,
    pub preset: String,
    pub crf: u8,
    pub tune: Option<String>,
    pub audio_bitrate: String,
    pub frame_timeout: Duration,
    pub progress_log_interval: Duration,
    pub scale_flags: String,
    pub render_mode_override: Option<String>,
    pub render_url: Option<String>,
    pub render_secret: Option<String>,
    pub webdriver_url: Option<String>,
    pub export_bucket: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Png,
    Jpeg,
}

impl ExportConfig {
    pub fn from_env() -> Self {
        let frame_format = match std::env::var("EDITOR_EXPORT_FRAME_FORMAT").as_deref() {
            Ok("jpeg") => FrameFormat::Jpeg,
            _ => FrameFormat::Png,
        };

        Self {
            fps: env_f64("EDITOR_EXPORT_FPS", 30.0),
            frame_format,
            jpeg_quality: env_u32("EDITOR_EXPORT_JPEG_QUALITY", 90).min(100) as u8,
            preset: std::env::var("EDITOR_EXPORT_PRESET").unwrap_or_else(|_| "medium".to_string()),
            crf: env_u32("EDITOR_EXPORT_CRF", 18).clamp(8, 24) as u8,
            tune: std::env::var("EDITOR_EXPORT_TUNE").ok(),
            audio_bitrate: std::env::var("EDITOR_EXPORT_AUDIO_BITRATE").unwrap_or_else(|_| "192k".to_string()),
            frame_timeout: Duration::from_millis(env_u64("EDITOR_EXPORT_FRAME_TIMEOUT_MS", 10_000)),
            progress_log_interval: Duration::from_millis(env_u64("EDITOR_EXPORT_PROGRESS_LOG_MS", 2_000)),
            scale_flags: std::env::var("EDITOR_EXPORT_SCALE_FLAGS").unwrap_or_else(|_| "lanczos".to_string()),
            render_mode_override: std::env::var("EDITOR_EXPORT_RENDER_MODE").ok(),
            render_url: std::env::var("EDITOR_RENDER_URL").ok(),
            render_secret: std::env::var("EDITOR_RENDER_SECRET").ok(),
            webdriver_url: std::env::var("EDITOR_WEBDRIVER_URL").ok(),
            export_bucket: std::env::var("AUTOCLIP_EXPORT_BUCKET").unwrap_or_else(|_| "autoclip-exports".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    pub chunk_seconds: f64,
    pub bitrate: String,
    pub bucket: String,
}

impl TranscribeConfig {
    pub fn from_env() -> Self {
        Self {
            chunk_seconds: env_f64("AUTOCLIP_TRANSCRIBE_CHUNK_SECONDS", 600.0),
            bitrate: std::env::var("AUTOCLIP_TRANSCRIBE_BITRATE").unwrap_or_else(|_| "64k".to_string()),
            bucket: std::env::var("AUTOCLIP_BUCKET").unwrap_or_else(|_| "autoclip".to_string()),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_crf_is_clamped_to_the_documented_range() {
        std::env::set_var("EDITOR_EXPORT_CRF", "40");
        let config = ExportConfig::from_env();
        assert_eq!(config.crf, 24);
        std::env::remove_var("EDITOR_EXPORT_CRF");
    }
}
