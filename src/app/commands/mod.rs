//! Tauri command surface. Each command resolves a trace id, loads the config,
//! and hands off to the domain modules.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::invocation::InvocationResult;
use crate::app::adb::locator::{inspect_adb, normalize_command_path, resolve_adb_program, validate_adb_program, AdbInfo};
use crate::app::adb::paths::require_local_path;
use crate::app::adb::runner::SystemAdb;
use crate::app::config::{load_config, normalize_config_for_save, save_config, AppConfig};
use crate::app::console::Console;
use crate::app::device::{self, InstallResult};
use crate::app::diagnostics;
use crate::app::error::AppError;
use crate::app::models::{CommandResponse, SamplingStarted, StartupInfo};
use crate::app::sampling::monitor;
use crate::app::sampling::SampleKind;
use crate::app::screen::{self, ScreenshotResult};
use crate::app::state::AppState;
use crate::app::system_info::{self, SystemInfoEntry};

fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn respond<T>(trace_id: String, data: T) -> Result<CommandResponse<T>, AppError> {
    Ok(CommandResponse { trace_id, data })
}

fn get_adb(config: &AppConfig, trace_id: &str) -> Result<SystemAdb, AppError> {
    let program = resolve_adb_program(&config.adb.command_path);
    if let Err(message) = validate_adb_program(&program) {
        return Err(AppError::dependency(message, trace_id));
    }
    Ok(SystemAdb::new(program))
}

fn output_dir(config: &AppConfig, trace_id: &str) -> Result<PathBuf, AppError> {
    let dir = config.output.output_dir_path();
    if dir.is_absolute() {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().map_err(|err| AppError::io("Failed to resolve working dir", err, trace_id))?;
    Ok(cwd.join(dir))
}

#[tauri::command(async)]
pub fn get_startup_info(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<StartupInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = inspect_adb(&resolve_adb_program(&config.adb.command_path), &trace_id);
    info!(trace_id = %trace_id, adb_available = adb.available, "startup info");
    respond(
        trace_id,
        StartupInfo {
            app_version: env!("CARGO_PKG_VERSION"),
            config,
            adb,
            system_info: system_info::list_entries(),
            console_text: state.console.snapshot(),
            recording: screen::is_recording(&state.recording),
        },
    )
}

#[tauri::command(async)]
pub fn get_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    respond(trace_id, config)
}

#[tauri::command(async)]
pub fn save_app_config(config: AppConfig, trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(config);
    save_config(&config, &trace_id)?;
    info!(trace_id = %trace_id, "config saved");
    respond(trace_id, config)
}

#[tauri::command(async)]
pub fn reset_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = normalize_config_for_save(AppConfig::default());
    save_config(&config, &trace_id)?;
    respond(trace_id, config)
}

#[tauri::command(async)]
pub fn check_adb(command_path: Option<String>, trace_id: Option<String>) -> Result<CommandResponse<AdbInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let program = command_path
        .as_deref()
        .map(normalize_command_path)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| resolve_adb_program(&config.adb.command_path));
    let info = inspect_adb(&program, &trace_id);
    respond(trace_id, info)
}

#[tauri::command(async)]
pub fn list_system_info(trace_id: Option<String>) -> Result<CommandResponse<Vec<SystemInfoEntry>>, AppError> {
    respond(resolve_trace_id(trace_id), system_info::list_entries())
}

#[tauri::command(async)]
pub fn capture_system_info(
    kind: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<InvocationResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let kind = system_info::parse_kind(&kind, &trace_id)?;
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let result = system_info::capture_system_info(
        &adb,
        &state.console,
        kind,
        &output_dir(&config, &trace_id)?,
        config.adb.command_timeout(),
        &trace_id,
    )?;
    respond(trace_id, result)
}

#[tauri::command(async)]
pub fn install_apk(
    apk_path: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<InstallResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let result = device::install_apk(&adb, &state.console, &apk_path, config.adb.install_timeout(), &trace_id)?;
    respond(trace_id, result)
}

#[tauri::command(async)]
pub fn reboot_device(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<InvocationResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let result = device::reboot_device(&adb, &state.console, config.adb.command_timeout(), &trace_id)?;
    respond(trace_id, result)
}

#[tauri::command(async)]
pub fn run_adb_command(
    command: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<InvocationResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let result = device::run_custom_command(&adb, &state.console, &command, config.adb.command_timeout(), &trace_id)?;
    respond(trace_id, result)
}

#[tauri::command(async)]
pub fn capture_screenshot(
    path: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ScreenshotResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let result = screen::capture_screenshot(&adb, &state.console, &path, config.adb.command_timeout(), &trace_id)?;
    respond(trace_id, result)
}

#[tauri::command(async)]
pub fn start_screen_record(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let remote_path = screen::start_recording(&adb, &state.console, &state.recording, &trace_id)?;
    respond(trace_id, remote_path)
}

#[tauri::command(async)]
pub fn stop_screen_record(
    path: Option<String>,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Option<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = get_adb(&config, &trace_id)?;
    let saved = screen::stop_recording(
        &adb,
        &state.console,
        &state.recording,
        path.as_deref(),
        config.adb.command_timeout(),
        &trace_id,
    )?;
    respond(trace_id, saved)
}

#[tauri::command(async)]
pub fn console_snapshot(state: State<'_, AppState>, trace_id: Option<String>) -> Result<CommandResponse<String>, AppError> {
    respond(resolve_trace_id(trace_id), state.console.snapshot())
}

#[tauri::command(async)]
pub fn clear_console(state: State<'_, AppState>, trace_id: Option<String>) -> Result<CommandResponse<bool>, AppError> {
    state.console.clear();
    respond(resolve_trace_id(trace_id), true)
}

fn append_ui_line(console: &Console, text: &str) -> bool {
    let line = text.trim_end();
    if line.trim().is_empty() {
        return false;
    }
    console.append_line(line);
    true
}

/// Lets the webview put its own messages (failed commands, notices) into the
/// shared console so exports and bundles see exactly what is on screen.
#[tauri::command(async)]
pub fn append_console(
    text: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<bool>, AppError> {
    respond(resolve_trace_id(trace_id), append_ui_line(&state.console, &text))
}

#[tauri::command(async)]
pub fn export_console(
    path: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    require_local_path(&path, "path", &trace_id)?;
    let written = state.console.export_to(&PathBuf::from(path.trim()), &trace_id)?;
    respond(trace_id, written.to_string_lossy().to_string())
}

/// Input is checked before config or adb are touched, so bad numbers are
/// always echoed to the console.
fn begin_sampling(
    state: &AppState,
    kind: &str,
    interval: &str,
    repeat: &str,
    trace_id: &str,
) -> Result<SamplingStarted, AppError> {
    let kind = SampleKind::from_id(kind)
        .ok_or_else(|| AppError::validation(format!("Unknown sampling kind: {kind}"), trace_id))?;
    let plan = monitor::check_sampling_inputs(&state.console, interval, repeat, trace_id)?;
    let config = load_config(trace_id)?;
    let adb = get_adb(&config, trace_id)?;
    let sampler_id = monitor::start_sampling(
        &state.samplers,
        kind,
        plan,
        Arc::new(adb),
        Arc::clone(&state.console),
        config.adb.command_timeout(),
        trace_id,
    )?;
    Ok(SamplingStarted {
        sampler_id,
        kind: kind.id().to_string(),
        interval_secs: plan.interval_secs,
        repeat: plan.repeat,
    })
}

#[tauri::command(async)]
pub fn start_sampling(
    kind: String,
    interval: String,
    repeat: String,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<SamplingStarted>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let started = begin_sampling(&state, &kind, &interval, &repeat, &trace_id)?;
    respond(trace_id, started)
}

#[tauri::command(async)]
pub fn stop_sampling(state: State<'_, AppState>, trace_id: Option<String>) -> Result<CommandResponse<usize>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let stopped = monitor::stop_sampling(&state.samplers, &trace_id)?;
    respond(trace_id, stopped)
}

#[tauri::command(async)]
pub fn export_diagnostics_bundle(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let adb = inspect_adb(&resolve_adb_program(&config.adb.command_path), &trace_id);
    let bundle = diagnostics::export_diagnostics_bundle(
        &output_dir(&config, &trace_id)?,
        &state.console.snapshot(),
        Some(&adb),
        &trace_id,
    )?;
    respond(trace_id, bundle.to_string_lossy().to_string())
}

#[tauri::command(async)]
pub fn open_output_dir(app: AppHandle, trace_id: Option<String>) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let dir = output_dir(&config, &trace_id)?;
    fs::create_dir_all(&dir).map_err(|err| AppError::io("Failed to create output dir", err, &trace_id))?;
    let dir = dir.to_string_lossy().to_string();
    if let Err(err) = app.opener().open_path(dir.clone(), None::<&str>) {
        warn!(trace_id = %trace_id, error = %err, "failed to open output dir");
        return Err(AppError::system(format!("Failed to open output dir: {err}"), &trace_id));
    }
    respond(trace_id, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_trace_id_keeps_caller_value() {
        assert_eq!(resolve_trace_id(Some("abc".to_string())), "abc");
        assert_eq!(resolve_trace_id(Some("  ".to_string())).len(), 36);
        assert_eq!(resolve_trace_id(None).len(), 36);
    }

    #[test]
    fn get_adb_rejects_missing_configured_path() {
        let mut config = AppConfig::default();
        config.adb.command_path = "/no/such/platform-tools/adb".to_string();
        let err = get_adb(&config, "trace-adb").expect_err("missing adb");
        assert_eq!(err.code, "ERR_DEPENDENCY");
    }

    #[test]
    fn relative_output_dir_is_anchored_to_working_dir() {
        let config = AppConfig::default();
        let dir = output_dir(&config, "t").expect("dir");
        assert!(dir.is_absolute());
        assert!(dir.ends_with("output"));
    }

    fn with_missing_adb_config<T>(body: impl FnOnce() -> T) -> T {
        let _guard = crate::app::config::env_lock();
        let dir = tempfile::TempDir::new().expect("tmp");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"adb":{"command_path":"/no/such/platform-tools/adb"}}"#).expect("config");
        std::env::set_var(crate::app::config::CONFIG_PATH_ENV, &path);
        let result = body();
        std::env::remove_var(crate::app::config::CONFIG_PATH_ENV);
        result
    }

    #[test]
    fn invalid_sampling_input_is_reported_before_adb_lookup() {
        let state = AppState::new(10_000);
        let err = with_missing_adb_config(|| begin_sampling(&state, "wifi", "abc", "3", "trace-sample"))
            .expect_err("invalid input");

        assert!(err.is_validation());
        assert_eq!(err.trace_id, "trace-sample");
        assert_eq!(
            state.console.snapshot(),
            format!("{}\n", monitor::INVALID_INPUT_MESSAGE)
        );
        assert!(state.samplers.lock().expect("samplers").is_empty());
    }

    #[test]
    fn valid_sampling_input_still_needs_adb() {
        let state = AppState::new(10_000);
        let err = with_missing_adb_config(|| begin_sampling(&state, "cellular", "1", "3", "t"))
            .expect_err("missing adb");

        assert_eq!(err.code, "ERR_DEPENDENCY");
        assert!(state.console.snapshot().is_empty());
        assert!(state.samplers.lock().expect("samplers").is_empty());
    }

    #[test]
    fn ui_lines_reach_the_shared_console() {
        let console = Console::new(10_000);
        assert!(!append_ui_line(&console, "  \n"));
        assert!(append_ui_line(&console, "Command timed out (ERR_SYSTEM)\n"));
        assert_eq!(console.snapshot(), "Command timed out (ERR_SYSTEM)\n");
    }
}
