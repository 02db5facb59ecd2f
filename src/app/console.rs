use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::paths::ensure_parent_dir;
use crate::app::error::AppError;

pub const CONSOLE_EVENT_NAME: &str = "console-event";
pub const EMPTY_EXPORT_MESSAGE: &str = "No output to export!";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleEvent {
    Appended { text: String },
    Cleared,
}

pub type ConsoleListener = Arc<dyn Fn(ConsoleEvent) + Send + Sync>;

/// The shared output log. Sampling threads and UI commands append to the same
/// buffer; the listener mirrors every change to whoever renders it.
pub struct Console {
    buffer: Mutex<String>,
    max_chars: usize,
    listener: RwLock<Option<ConsoleListener>>,
}

impl Console {
    pub fn new(max_chars: usize) -> Self {
        Self {
            buffer: Mutex::new(String::new()),
            max_chars: max_chars.max(1),
            listener: RwLock::new(None),
        }
    }

    pub fn set_listener(&self, listener: ConsoleListener) {
        if let Ok(mut guard) = self.listener.write() {
            *guard = Some(listener);
        }
    }

    pub fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        {
            let mut guard = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.push_str(text);
            trim_front(&mut guard, self.max_chars);
        }
        self.notify(ConsoleEvent::Appended {
            text: text.to_string(),
        });
    }

    pub fn append_line(&self, line: &str) {
        let mut text = line.to_string();
        text.push('\n');
        self.append(&text);
    }

    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        self.notify(ConsoleEvent::Cleared);
    }

    pub fn snapshot(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Writes the trimmed log to `path`. An empty log is rejected before any
    /// file is touched.
    pub fn export_to(&self, path: &Path, trace_id: &str) -> Result<PathBuf, AppError> {
        let text = self.snapshot().trim().to_string();
        if text.is_empty() {
            warn!(trace_id = %trace_id, "export requested with empty console");
            return Err(AppError::validation(EMPTY_EXPORT_MESSAGE, trace_id));
        }
        ensure_parent_dir(path, trace_id)?;
        fs::write(path, text).map_err(|err| AppError::io("Failed to export output", err, trace_id))?;
        info!(trace_id = %trace_id, path = %path.display(), "console exported");
        Ok(path.to_path_buf())
    }

    fn notify(&self, event: ConsoleEvent) {
        let listener = match self.listener.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

/// Drops whole lines from the front until `buffer` holds at most `max_chars`
/// characters. A single oversized line is cut mid-line.
fn trim_front(buffer: &mut String, max_chars: usize) {
    if buffer.len() <= max_chars {
        return;
    }
    let total = buffer.chars().count();
    if total <= max_chars {
        return;
    }
    let excess = total - max_chars;
    let mut indices = buffer.char_indices().map(|(index, _)| index);
    let last_dropped = indices.nth(excess - 1).unwrap_or(0);
    let first_kept = indices.next().unwrap_or(buffer.len());
    let cut = match buffer[last_dropped..].find('\n') {
        Some(offset) => last_dropped + offset + 1,
        None => first_kept,
    };
    buffer.drain(..cut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_and_clear_notify_listener() {
        let console = Console::new(1_000);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        console.set_listener(Arc::new(move |event| {
            seen_clone.lock().expect("events").push(event);
        }));

        console.append_line("Recording started...");
        console.clear();

        let events = seen.lock().expect("events");
        assert_eq!(
            *events,
            vec![
                ConsoleEvent::Appended {
                    text: "Recording started...\n".to_string()
                },
                ConsoleEvent::Cleared,
            ]
        );
        assert!(console.snapshot().is_empty());
    }

    #[test]
    fn export_of_empty_log_warns_and_writes_nothing() {
        let dir = TempDir::new().expect("tmp");
        let target = dir.path().join("adb_output.txt");
        let console = Console::new(1_000);
        console.append("   \n\n");

        let err = console.export_to(&target, "trace-export").expect_err("empty");
        assert!(err.is_validation());
        assert_eq!(err.error, EMPTY_EXPORT_MESSAGE);
        assert!(!target.exists());
    }

    #[test]
    fn export_writes_trimmed_text() {
        let dir = TempDir::new().expect("tmp");
        let target = dir.path().join("nested/adb_output.txt");
        let console = Console::new(1_000);
        console.append("\nline one\nline two\n\n");

        console.export_to(&target, "t").expect("export");
        assert_eq!(fs::read_to_string(&target).expect("read"), "line one\nline two");
    }

    #[test]
    fn oversized_buffer_drops_oldest_lines() {
        let console = Console::new(12);
        console.append("first\nsecond\n");
        console.append("third\n");
        assert_eq!(console.snapshot(), "third\n");
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let mut buffer = "ééééé".to_string();
        trim_front(&mut buffer, 5);
        assert_eq!(buffer, "ééééé");

        let mut buffer = "éééééé".to_string();
        trim_front(&mut buffer, 5);
        assert_eq!(buffer, "ééééé");

        let mut buffer = "ééé\nab\n".to_string();
        trim_front(&mut buffer, 4);
        assert_eq!(buffer, "ab\n");
    }

    #[test]
    fn multibyte_log_within_limit_is_kept() {
        let console = Console::new(10);
        console.append("信号强度\nRSSI\n");
        assert_eq!(console.snapshot(), "信号强度\nRSSI\n");
    }
}
