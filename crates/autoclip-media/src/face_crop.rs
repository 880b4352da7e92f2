//! Wrapper for the external Python face-crop helper (§4.6, §1): an argv-level
//! subprocess contract — input clip path, output clip path, mode — with the
//! exit code reported back as the operation's result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::run_process;
use crate::error::{MediaError, MediaResult};

/// Cropping mode passed through to the helper's `mode` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceCropMode {
    Center,
    Track,
}

impl FaceCropMode {
    fn as_arg(self) -> &'static str {
        match self {
            FaceCropMode::Center => "center",
            FaceCropMode::Track => "track",
        }
    }
}

/// Invoke the face-crop helper: `python3 <script> <input> <output> <mode>`.
pub async fn run_face_crop(
    script_path: &Path,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: FaceCropMode,
) -> MediaResult<PathBuf> {
    if !script_path.exists() {
        return Err(MediaError::FaceCropScriptNotFound(script_path.to_path_buf()));
    }

    let input = input.as_ref();
    let output = output.as_ref();

    let args = vec![
        script_path.to_string_lossy().to_string(),
        input.to_string_lossy().to_string(),
        output.to_string_lossy().to_string(),
        mode.as_arg().to_string(),
    ];

    let result = run_process("face-crop", "python3", &args, Some(Duration::from_secs(120))).await?;
    if !result.success {
        return Err(MediaError::process_failed("face-crop", result.exit_code, result.stderr_tail));
    }

    if !output.exists() {
        return Err(MediaError::process_failed("face-crop", result.exit_code, "helper exited cleanly but produced no output"));
    }

    Ok(output.to_path_buf())
}
