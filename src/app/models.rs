use serde::Serialize;

use crate::app::adb::locator::AdbInfo;
use crate::app::config::AppConfig;
use crate::app::system_info::SystemInfoEntry;

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

/// Everything the webview needs to draw its first frame.
#[derive(Debug, Clone, Serialize)]
pub struct StartupInfo {
    pub app_version: &'static str,
    pub config: AppConfig,
    pub adb: AdbInfo,
    pub system_info: Vec<SystemInfoEntry>,
    pub console_text: String,
    pub recording: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SamplingStarted {
    pub sampler_id: String,
    pub kind: String,
    pub interval_secs: u64,
    pub repeat: u64,
}
