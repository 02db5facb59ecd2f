use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::adb::invocation::{run_invocation, CommandLine, Invocation, InvocationResult};
use crate::app::adb::runner::AdbBackend;
use crate::app::console::Console;
use crate::app::error::AppError;

/// The fixed "System Information" shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemInfoKind {
    Getprop,
    DumpsysWifi,
    DumpsysBattery,
    DumpsysWindow,
    DumpsysActivity,
    DumpsysPackage,
    DumpsysCpuinfo,
}

impl SystemInfoKind {
    pub const ALL: [SystemInfoKind; 7] = [
        SystemInfoKind::Getprop,
        SystemInfoKind::DumpsysWifi,
        SystemInfoKind::DumpsysBattery,
        SystemInfoKind::DumpsysWindow,
        SystemInfoKind::DumpsysActivity,
        SystemInfoKind::DumpsysPackage,
        SystemInfoKind::DumpsysCpuinfo,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SystemInfoKind::Getprop => "getprop",
            SystemInfoKind::DumpsysWifi => "dumpsys_wifi",
            SystemInfoKind::DumpsysBattery => "dumpsys_battery",
            SystemInfoKind::DumpsysWindow => "dumpsys_window",
            SystemInfoKind::DumpsysActivity => "dumpsys_activity",
            SystemInfoKind::DumpsysPackage => "dumpsys_package",
            SystemInfoKind::DumpsysCpuinfo => "dumpsys_cpuinfo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            SystemInfoKind::Getprop => "Getprop",
            SystemInfoKind::DumpsysWifi => "Dumpsys Wifi",
            SystemInfoKind::DumpsysBattery => "Dumpsys Battery",
            SystemInfoKind::DumpsysWindow => "Dumpsys Window",
            SystemInfoKind::DumpsysActivity => "Dumpsys Activity",
            SystemInfoKind::DumpsysPackage => "Dumpsys Package",
            SystemInfoKind::DumpsysCpuinfo => "Dumpsys CPU Info",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SystemInfoKind::Getprop => "Retrieve system properties and configurations.",
            SystemInfoKind::DumpsysWifi => "Get detailed WiFi status and network information.",
            SystemInfoKind::DumpsysBattery => "Display battery health and charge details.",
            SystemInfoKind::DumpsysWindow => "Get information about the window manager.",
            SystemInfoKind::DumpsysActivity => "Show the activity manager state.",
            SystemInfoKind::DumpsysPackage => "List installed packages and their details.",
            SystemInfoKind::DumpsysCpuinfo => "Show CPU usage and performance statistics.",
        }
    }

    pub fn args(self) -> Vec<String> {
        let tail: &[&str] = match self {
            SystemInfoKind::Getprop => &["getprop"],
            SystemInfoKind::DumpsysWifi => &["dumpsys", "wifi"],
            SystemInfoKind::DumpsysBattery => &["dumpsys", "battery"],
            SystemInfoKind::DumpsysWindow => &["dumpsys", "window"],
            SystemInfoKind::DumpsysActivity => &["dumpsys", "activity"],
            SystemInfoKind::DumpsysPackage => &["dumpsys", "package"],
            SystemInfoKind::DumpsysCpuinfo => &["dumpsys", "cpuinfo"],
        };
        std::iter::once("shell")
            .chain(tail.iter().copied())
            .map(str::to_string)
            .collect()
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.id())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SystemInfoEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub file_name: String,
}

pub fn list_entries() -> Vec<SystemInfoEntry> {
    SystemInfoKind::ALL
        .into_iter()
        .map(|kind| SystemInfoEntry {
            id: kind.id(),
            label: kind.label(),
            description: kind.description(),
            file_name: kind.file_name(),
        })
        .collect()
}

pub fn parse_kind(id: &str, trace_id: &str) -> Result<SystemInfoKind, AppError> {
    SystemInfoKind::from_id(id)
        .ok_or_else(|| AppError::validation(format!("Unknown system information kind: {id}"), trace_id))
}

/// Runs the capture, saves it as `<output_dir>/<id>.txt` and echoes it to the console.
pub fn capture_system_info(
    adb: &dyn AdbBackend,
    console: &Console,
    kind: SystemInfoKind,
    output_dir: &Path,
    timeout: Duration,
    trace_id: &str,
) -> Result<InvocationResult, AppError> {
    info!(trace_id = %trace_id, kind = kind.id(), "capture system info");
    let invocation = Invocation::new(CommandLine::single(kind.args()), timeout)
        .with_output_file(output_dir.join(kind.file_name()));
    run_invocation(adb, console, invocation, trace_id)
}
