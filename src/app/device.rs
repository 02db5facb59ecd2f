use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::invocation::{run_invocation, CommandLine, Invocation, InvocationResult};
use crate::app::adb::paths::require_local_path;
use crate::app::adb::runner::AdbBackend;
use crate::app::console::Console;
use crate::app::error::AppError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InstallResult {
    pub apk_path: String,
    pub success: bool,
    pub output: InvocationResult,
}

pub fn validate_apk_path(apk_path: &str, trace_id: &str) -> Result<(), AppError> {
    require_local_path(apk_path, "apk_path", trace_id)?;
    let path = Path::new(apk_path.trim());
    if !path.is_file() {
        return Err(AppError::validation(
            format!("APK file not found: {}", apk_path.trim()),
            trace_id,
        ));
    }
    Ok(())
}

pub fn install_apk(
    adb: &dyn AdbBackend,
    console: &Console,
    apk_path: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<InstallResult, AppError> {
    validate_apk_path(apk_path, trace_id)?;
    let apk_path = apk_path.trim().to_string();
    info!(trace_id = %trace_id, apk = %apk_path, "install apk");

    let invocation = Invocation::new(CommandLine::single(["install", apk_path.as_str()]), timeout);
    let output = run_invocation(adb, console, invocation, trace_id)?;
    let success = output.exit_code == Some(0);
    if success {
        console.append_line(&format!("APK installed: {apk_path}"));
    } else {
        warn!(trace_id = %trace_id, apk = %apk_path, stderr = %output.stderr.trim(), "install failed");
        let reason = output.stderr.trim();
        if !reason.is_empty() {
            console.append_line(reason);
        }
    }

    Ok(InstallResult {
        apk_path,
        success,
        output,
    })
}

pub fn reboot_device(
    adb: &dyn AdbBackend,
    console: &Console,
    timeout: Duration,
    trace_id: &str,
) -> Result<InvocationResult, AppError> {
    info!(trace_id = %trace_id, "reboot device");
    run_invocation(
        adb,
        console,
        Invocation::new(CommandLine::single(["reboot"]), timeout),
        trace_id,
    )
}

/// Free-form command typed by the user, e.g. `shell dumpsys meminfo`.
pub fn run_custom_command(
    adb: &dyn AdbBackend,
    console: &Console,
    command_line: &str,
    timeout: Duration,
    trace_id: &str,
) -> Result<InvocationResult, AppError> {
    let command = CommandLine::parse(command_line, trace_id)?;
    run_invocation(adb, console, Invocation::new(command, timeout), trace_id)
}
