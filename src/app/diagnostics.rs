use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use zip::write::FileOptions;

use crate::app::adb::locator::AdbInfo;
use crate::app::adb::paths::sanitize_filename_component;
use crate::app::error::AppError;

#[derive(Debug, Serialize)]
struct BundleManifest<'a> {
    app_version: &'static str,
    os: &'static str,
    arch: &'static str,
    timestamp_utc: String,
    trace_id: &'a str,
    adb: Option<&'a AdbInfo>,
    captures: Vec<String>,
}

/// Zips the capture files in `output_dir`, the console text and a manifest
/// into `output_dir/adb_toolbox_bundle_<timestamp>_<trace>.zip`.
pub fn export_diagnostics_bundle(
    output_dir: &Path,
    console_text: &str,
    adb: Option<&AdbInfo>,
    trace_id: &str,
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(output_dir).map_err(|err| AppError::io("Failed to create output dir", err, trace_id))?;

    let captures = list_capture_files(output_dir, trace_id)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let trace_short = sanitize_filename_component(trace_id)
        .chars()
        .take(8)
        .collect::<String>();
    let bundle_path = output_dir.join(format!("adb_toolbox_bundle_{timestamp}_{trace_short}.zip"));

    let manifest = BundleManifest {
        app_version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        timestamp_utc: Utc::now().to_rfc3339(),
        trace_id,
        adb,
        captures: captures
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
            .collect(),
    };
    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|err| AppError::system(format!("Failed to serialize manifest: {err}"), trace_id))?;

    let write_err = |err: zip::result::ZipError| AppError::system(format!("Failed to write bundle: {err}"), trace_id);
    let file = fs::File::create(&bundle_path).map_err(|err| AppError::io("Failed to create bundle", err, trace_id))?;
    let mut zip = zip::ZipWriter::new(file);

    zip.start_file("manifest.json", FileOptions::<()>::default())
        .map_err(write_err)?;
    zip.write_all(&manifest_json)
        .map_err(|err| AppError::io("Failed to write bundle", err, trace_id))?;

    zip.start_file("console.txt", FileOptions::<()>::default())
        .map_err(write_err)?;
    zip.write_all(console_text.as_bytes())
        .map_err(|err| AppError::io("Failed to write bundle", err, trace_id))?;

    for path in &captures {
        let Some(name) = path.file_name().map(|name| name.to_string_lossy().to_string()) else {
            continue;
        };
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(trace_id = %trace_id, path = %path.display(), error = %err, "skipping unreadable capture");
                continue;
            }
        };
        zip.start_file(format!("captures/{name}"), FileOptions::<()>::default())
            .map_err(write_err)?;
        zip.write_all(&bytes)
            .map_err(|err| AppError::io("Failed to write bundle", err, trace_id))?;
    }

    zip.finish()
        .map_err(|err| AppError::system(format!("Failed to finalize bundle: {err}"), trace_id))?;
    info!(trace_id = %trace_id, path = %bundle_path.display(), files = captures.len(), "diagnostics bundle written");
    Ok(bundle_path)
}

fn list_capture_files(output_dir: &Path, trace_id: &str) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(output_dir).map_err(|err| AppError::io("Failed to read output dir", err, trace_id))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| !ext.eq_ignore_ascii_case("zip"))
                .unwrap_or(true)
        })
        .collect();
    files.sort();
    Ok(files)
}
