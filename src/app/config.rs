use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::error::AppError;

pub const CONFIG_PATH_ENV: &str = "ADB_TOOLBOX_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdbSettings {
    pub command_path: String,
    pub command_timeout_secs: u64,
    pub install_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            command_timeout_secs: 60,
            install_timeout_secs: 300,
        }
    }
}

impl AdbSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub output_dir: String,
    pub screenshot_file_name: String,
    pub recording_file_name: String,
    pub export_file_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            screenshot_file_name: "screenshot.png".to_string(),
            recording_file_name: "screenrecord.mp4".to_string(),
            export_file_name: "adb_output.txt".to_string(),
        }
    }
}

impl OutputSettings {
    pub fn output_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingSettings {
    pub default_interval_secs: u64,
    pub default_repeat: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            default_interval_secs: 5,
            default_repeat: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleSettings {
    pub max_chars: usize,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            max_chars: 2_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub console: ConsoleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub version: String,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    home_dir().join(".adb_toolbox_config.json")
}

fn backup_config_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "adb_toolbox_config".to_string());
    name.push_str(".backup.json");
    path.with_file_name(name)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    let path = config_path();
    save_config_to_path(config, &path, &backup_config_path(&path), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(validate_config(AppConfig::default()));
    }
    let raw = fs::read_to_string(path).map_err(|err| AppError::io("Failed to read config", err, trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload).map_err(|err| AppError::io("Failed to write config", err, trace_id))?;
    Ok(())
}

/// Prepares a config coming from the UI for persistence.
pub fn normalize_config_for_save(mut config: AppConfig) -> AppConfig {
    config.adb.command_path = config.adb.command_path.trim().to_string();
    config.output.output_dir = config.output.output_dir.trim().to_string();
    config.version = env!("CARGO_PKG_VERSION").to_string();
    validate_config(config)
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    let defaults = AppConfig::default();
    if config.adb.command_timeout_secs == 0 {
        config.adb.command_timeout_secs = defaults.adb.command_timeout_secs;
    }
    if config.adb.install_timeout_secs < config.adb.command_timeout_secs {
        config.adb.install_timeout_secs = config
            .adb
            .command_timeout_secs
            .max(defaults.adb.install_timeout_secs);
    }
    if config.output.output_dir.trim().is_empty() {
        config.output.output_dir = defaults.output.output_dir;
    }
    if config.output.screenshot_file_name.trim().is_empty() {
        config.output.screenshot_file_name = defaults.output.screenshot_file_name;
    }
    if config.output.recording_file_name.trim().is_empty() {
        config.output.recording_file_name = defaults.output.recording_file_name;
    }
    if config.output.export_file_name.trim().is_empty() {
        config.output.export_file_name = defaults.output.export_file_name;
    }
    if config.console.max_chars < 10_000 {
        config.console.max_chars = defaults.console.max_chars;
    }
    if config.version.is_empty() {
        config.version = env!("CARGO_PKG_VERSION").to_string();
    }
    config
}

#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
