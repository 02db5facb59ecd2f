use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::invocation::{run_invocation, CommandLine, Invocation};
use crate::app::adb::paths::{
    require_local_path, with_default_extension, DEVICE_RECORDING_PATH, DEVICE_SCREENSHOT_PATH,
};
use crate::app::adb::runner::{wait_or_kill, AdbBackend};
use crate::app::console::Console;
use crate::app::error::AppError;
use crate::app::preview::png_file_to_data_url;
use crate::app::state::RecordingHandle;

const RECORDING_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScreenshotResult {
    pub path: String,
    pub exit_code: Option<i32>,
    pub preview_data_url: Option<String>,
    pub preview_error: Option<String>,
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn capture_screenshot(
    adb: &dyn AdbBackend,
    console: &Console,
    destination: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<ScreenshotResult, AppError> {
    require_local_path(destination, "destination", trace_id)?;
    let local_path = with_default_extension(destination, "png");
    let local = local_path.to_string_lossy().to_string();
    info!(trace_id = %trace_id, path = %local, "capture screenshot");

    let command = CommandLine::from_steps(vec![
        words(&["shell", "screencap", "-p", DEVICE_SCREENSHOT_PATH]),
        words(&["pull", DEVICE_SCREENSHOT_PATH, local.as_str()]),
    ]);
    let output = run_invocation(adb, console, Invocation::new(command, timeout), trace_id)?;

    let (preview_data_url, preview_error) = if output.exit_code == Some(0) {
        match png_file_to_data_url(&local_path) {
            Ok(url) => (Some(url), None),
            Err(message) => {
                warn!(trace_id = %trace_id, error = %message, "screenshot preview unavailable");
                (None, Some(message))
            }
        }
    } else {
        (None, Some(output.stderr.trim().to_string()))
    };

    Ok(ScreenshotResult {
        path: local,
        exit_code: output.exit_code,
        preview_data_url,
        preview_error,
    })
}

pub fn start_recording(
    adb: &dyn AdbBackend,
    console: &Console,
    slot: &Mutex<Option<RecordingHandle>>,
    trace_id: &str,
) -> Result<String, AppError> {
    let mut guard = slot
        .lock()
        .map_err(|_| AppError::system("Recording registry locked", trace_id))?;
    if guard.is_some() {
        return Err(AppError::validation("Recording already active", trace_id));
    }

    let args = words(&["shell", "screenrecord", DEVICE_RECORDING_PATH]);
    let child = adb.spawn(&args, trace_id)?;
    info!(trace_id = %trace_id, pid = child.id(), "screen recording started");
    *guard = Some(RecordingHandle {
        child,
        remote_path: DEVICE_RECORDING_PATH.to_string(),
    });
    console.append_line("Recording started...");
    Ok(DEVICE_RECORDING_PATH.to_string())
}

/// Ends the active recording. With a destination the clip is pulled and the
/// device copy removed; without one it stays on the device.
pub fn stop_recording(
    adb: &dyn AdbBackend,
    console: &Console,
    slot: &Mutex<Option<RecordingHandle>>,
    destination: Option<&str>,
    timeout: Duration,
    trace_id: &str,
) -> Result<Option<String>, AppError> {
    let handle = slot
        .lock()
        .map_err(|_| AppError::system("Recording registry locked", trace_id))?
        .take();
    let Some(handle) = handle else {
        return Err(AppError::validation("No recording in progress", trace_id));
    };
    let RecordingHandle {
        mut child,
        remote_path,
    } = handle;

    // screenrecord only finalizes the mp4 on SIGINT.
    let interrupt = words(&["shell", "pkill", "-SIGINT", "screenrecord"]);
    if let Err(err) = adb.run(&interrupt, RECORDING_STOP_TIMEOUT, trace_id) {
        warn!(trace_id = %trace_id, error = %err.error, "failed to interrupt screenrecord");
    }
    match wait_or_kill(&mut child, RECORDING_STOP_TIMEOUT) {
        Ok(true) => {}
        Ok(false) => warn!(trace_id = %trace_id, "screenrecord did not exit; killed"),
        Err(err) => warn!(trace_id = %trace_id, error = %err, "failed to wait for screenrecord"),
    }

    let saved = match destination.map(str::trim).filter(|value| !value.is_empty()) {
        Some(destination) => {
            let local_path: PathBuf = with_default_extension(destination, "mp4");
            let local = local_path.to_string_lossy().to_string();
            let command = CommandLine::from_steps(vec![
                words(&["pull", remote_path.as_str(), local.as_str()]),
                words(&["shell", "rm", remote_path.as_str()]),
            ]);
            let output = run_invocation(adb, console, Invocation::new(command, timeout), trace_id)?;
            if output.exit_code == Some(0) {
                Some(local)
            } else {
                warn!(trace_id = %trace_id, stderr = %output.stderr.trim(), "recording pull failed");
                None
            }
        }
        None => None,
    };

    console.append_line("Recording stopped.");
    Ok(saved)
}

pub fn is_recording(slot: &Mutex<Option<RecordingHandle>>) -> bool {
    slot.lock().map(|guard| guard.is_some()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adb::invocation::testing::{failed, ok, ScriptedAdb};
    use tempfile::TempDir;

    #[test]
    fn screenshot_captures_then_pulls() {
        let dir = TempDir::new().expect("tmp");
        let target = dir.path().join("home");
        let adb = ScriptedAdb::new().push(Ok(ok(""))).push(Ok(ok("1 file pulled.\n")));
        let console = Console::new(10_000);

        let result = capture_screenshot(&adb, &console, &target.to_string_lossy(), Duration::from_secs(1), "t")
            .expect("screenshot");

        let expected = dir.path().join("home.png").to_string_lossy().to_string();
        assert_eq!(result.path, expected);
        assert_eq!(
            adb.calls(),
            vec![
                words(&["shell", "screencap", "-p", DEVICE_SCREENSHOT_PATH]),
                words(&["pull", DEVICE_SCREENSHOT_PATH, expected.as_str()]),
            ]
        );
        // The scripted pull wrote nothing locally.
        assert!(result.preview_data_url.is_none());
        assert!(result.preview_error.is_some());
    }

    #[test]
    fn screenshot_skips_pull_when_capture_fails() {
        let adb = ScriptedAdb::new().push(Ok(failed(1, "error: no devices/emulators found")));
        let console = Console::new(10_000);
        let result = capture_screenshot(&adb, &console, "/tmp/shot.png", Duration::from_secs(1), "t")
            .expect("screenshot");
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(adb.calls().len(), 1);
        assert_eq!(result.preview_error.as_deref(), Some("error: no devices/emulators found"));
    }

    #[test]
    fn recording_lifecycle_pulls_and_cleans_up() {
        let dir = TempDir::new().expect("tmp");
        let target = dir.path().join("clip.mp4").to_string_lossy().to_string();
        let adb = ScriptedAdb::new();
        let console = Console::new(10_000);
        let slot = Mutex::new(None);

        start_recording(&adb, &console, &slot, "t").expect("start");
        assert!(is_recording(&slot));
        let err = start_recording(&adb, &console, &slot, "t").expect_err("second start");
        assert!(err.error.contains("already active"));

        let saved = stop_recording(&adb, &console, &slot, Some(&target), Duration::from_secs(1), "t")
            .expect("stop");
        assert_eq!(saved.as_deref(), Some(target.as_str()));
        assert!(!is_recording(&slot));
        assert_eq!(
            adb.calls(),
            vec![
                words(&["shell", "pkill", "-SIGINT", "screenrecord"]),
                words(&["pull", DEVICE_RECORDING_PATH, target.as_str()]),
                words(&["shell", "rm", DEVICE_RECORDING_PATH]),
            ]
        );
        assert_eq!(
            *adb.spawned.lock().expect("spawned"),
            vec![words(&["shell", "screenrecord", DEVICE_RECORDING_PATH])]
        );
        let log = console.snapshot();
        assert!(log.starts_with("Recording started...\n"));
        assert!(log.ends_with("Recording stopped.\n"));
    }

    #[test]
    fn stop_without_destination_leaves_clip_on_device() {
        let adb = ScriptedAdb::new();
        let console = Console::new(10_000);
        let slot = Mutex::new(None);
        start_recording(&adb, &console, &slot, "t").expect("start");

        let saved = stop_recording(&adb, &console, &slot, None, Duration::from_secs(1), "t").expect("stop");
        assert!(saved.is_none());
        assert_eq!(adb.calls().len(), 1);
    }

    #[test]
    fn stop_without_recording_is_validation_error() {
        let adb = ScriptedAdb::new();
        let console = Console::new(10_000);
        let slot = Mutex::new(None);
        let err = stop_recording(&adb, &console, &slot, None, Duration::from_secs(1), "trace-stop")
            .expect_err("nothing to stop");
        assert!(err.is_validation());
        assert!(adb.calls().is_empty());
    }
}
