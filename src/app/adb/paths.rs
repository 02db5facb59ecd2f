use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

/// Device-side scratch files used by screenshot and recording.
pub const DEVICE_SCREENSHOT_PATH: &str = "/sdcard/screenshot.png";
pub const DEVICE_RECORDING_PATH: &str = "/sdcard/screenrecord.mp4";

pub fn sanitize_filename_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Adds `extension` when the user-chosen path has none, like a save dialog's
/// default extension.
pub fn with_default_extension(path: &str, extension: &str) -> PathBuf {
    let path = PathBuf::from(path.trim());
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(extension)
    }
}

pub fn require_local_path(path: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required"), trace_id));
    }
    if trimmed.contains('\0') {
        return Err(AppError::validation(format!("{field} contains invalid characters"), trace_id));
    }
    Ok(())
}

pub fn ensure_parent_dir(path: &Path, trace_id: &str) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| AppError::io("Failed to create output dir", err, trace_id))
        }
        _ => Ok(()),
    }
}
