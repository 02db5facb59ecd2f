pub mod adb;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod console;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod models;
pub mod preview;
pub mod sampling;
pub mod screen;
pub mod state;
pub mod system_info;
