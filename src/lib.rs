pub mod app;

#[cfg(feature = "desktop")]
use app::commands::{
    append_console, capture_screenshot, capture_system_info, check_adb, clear_console, console_snapshot,
    export_console, export_diagnostics_bundle, get_config, get_startup_info, install_apk,
    list_system_info, open_output_dir, reboot_device, reset_config, run_adb_command,
    save_app_config, start_sampling, start_screen_record, stop_sampling, stop_screen_record,
};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    use tauri::{Emitter, Manager};

    use app::config::{load_config, AppConfig};
    use app::console::{ConsoleEvent, CONSOLE_EVENT_NAME};
    use app::logging::init_logging;
    use app::state::AppState;

    let config = load_config("startup").unwrap_or_else(|_| AppConfig::default());
    init_logging(&config.logging.log_level);

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_opener::init())
        .manage(AppState::new(config.console.max_chars))
        .setup(|app| {
            let handle = app.handle().clone();
            let state = app.state::<AppState>();
            state.console.set_listener(Arc::new(move |event: ConsoleEvent| {
                let _ = handle.emit(CONSOLE_EVENT_NAME, event);
            }));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_startup_info,
            get_config,
            save_app_config,
            reset_config,
            check_adb,
            list_system_info,
            capture_system_info,
            install_apk,
            reboot_device,
            run_adb_command,
            capture_screenshot,
            start_screen_record,
            stop_screen_record,
            console_snapshot,
            append_console,
            clear_console,
            export_console,
            start_sampling,
            stop_sampling,
            export_diagnostics_bundle,
            open_output_dir
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
