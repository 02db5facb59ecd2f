use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::adb::runner::run_command_with_timeout;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdbInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

pub fn resolve_adb_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        "adb".to_string()
    } else {
        normalized
    }
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("ADB command is empty".to_string());
    }
    if program == "adb" {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("ADB path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("ADB executable not found at the configured path".to_string());
    }
    Ok(())
}

/// Runs `adb version` and folds the outcome into an [`AdbInfo`]; never errors.
pub fn inspect_adb(program: &str, trace_id: &str) -> AdbInfo {
    if let Err(message) = validate_adb_program(program) {
        warn!(trace_id = %trace_id, error = %message, "adb validation failed");
        return AdbInfo {
            available: false,
            version_output: String::new(),
            command_path: program.to_string(),
            error: Some(message),
        };
    }

    let args = vec!["version".to_string()];
    let output = match run_command_with_timeout(program, &args, Duration::from_secs(5), trace_id) {
        Ok(output) => output,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "adb check failed");
            return AdbInfo {
                available: false,
                version_output: String::new(),
                command_path: program.to_string(),
                error: Some(err.error),
            };
        }
    };

    let mut version_output = output.stdout.trim().to_string();
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        if !version_output.is_empty() {
            version_output.push('\n');
        }
        version_output.push_str(stderr);
    }

    let available = output.success();
    AdbInfo {
        available,
        version_output,
        command_path: program.to_string(),
        error: if available {
            None
        } else if stderr.is_empty() {
            Some("ADB command returned a non-zero exit code".to_string())
        } else {
            Some(stderr.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/android/platform-tools/adb\"  "),
            "/opt/android/platform-tools/adb"
        );
        assert_eq!(
            normalize_command_path("'/opt/android/platform-tools/adb'"),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn resolves_empty_to_path_lookup() {
        assert_eq!(resolve_adb_program(""), "adb");
        assert_eq!(resolve_adb_program("  \"\" "), "adb");
    }

    #[test]
    fn rejects_directories_and_missing_paths() {
        let dir = std::env::temp_dir();
        let err = validate_adb_program(&dir.to_string_lossy()).unwrap_err();
        assert!(err.contains("executable file"));
        let err = validate_adb_program("/this/path/should/not/exist/adb").unwrap_err();
        assert!(err.to_lowercase().contains("not found"));
    }

    #[test]
    fn missing_adb_reports_unavailable_without_erroring() {
        let info = inspect_adb("/this/path/should/not/exist/adb", "trace-inspect");
        assert!(!info.available);
        assert!(info.error.is_some());
        assert!(info.version_output.is_empty());
    }
}
