use std::collections::HashMap;
use std::process::Child;
use std::sync::{Arc, Mutex};

use crate::app::console::Console;
use crate::app::sampling::monitor::SamplingHandle;

pub struct RecordingHandle {
    pub child: Child,
    pub remote_path: String,
}

pub struct AppState {
    pub console: Arc<Console>,
    pub recording: Mutex<Option<RecordingHandle>>,
    pub samplers: Mutex<HashMap<String, SamplingHandle>>,
}

impl AppState {
    pub fn new(max_console_chars: usize) -> Self {
        Self {
            console: Arc::new(Console::new(max_console_chars)),
            recording: Mutex::new(None),
            samplers: Mutex::new(HashMap::new()),
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.recording.lock() {
            if let Some(mut handle) = guard.take() {
                let _ = handle.child.kill();
                let _ = handle.child.wait();
            }
        }
    }
}
