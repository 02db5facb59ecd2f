use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::app::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Everything that talks to a device goes through this seam.
pub trait AdbBackend: Send + Sync {
    /// Runs `adb <args>` to completion.
    fn run(&self, args: &[String], timeout: Duration, trace_id: &str) -> Result<CommandOutput, AppError>;

    /// Starts `adb <args>` without waiting; its output is discarded.
    fn spawn(&self, args: &[String], trace_id: &str) -> Result<Child, AppError>;
}

#[derive(Debug, Clone)]
pub struct SystemAdb {
    program: String,
}

impl SystemAdb {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AdbBackend for SystemAdb {
    fn run(&self, args: &[String], timeout: Duration, trace_id: &str) -> Result<CommandOutput, AppError> {
        debug!(trace_id = %trace_id, program = %self.program, args = ?args, "running adb");
        run_command_with_timeout(&self.program, args, timeout, trace_id)
    }

    fn spawn(&self, args: &[String], trace_id: &str) -> Result<Child, AppError> {
        debug!(trace_id = %trace_id, program = %self.program, args = ?args, "spawning adb");
        Command::new(&self.program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| AppError::dependency(format!("Failed to start adb: {err}"), trace_id))
    }
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    // Both pipes are drained while we poll; a full pipe would otherwise stall the child.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;
    let stdout_handle = drain(stdout);
    let stderr_handle = drain(stderr);

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(AppError::system("Command timed out", trace_id));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(format!("Failed to poll command: {err}"), trace_id));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        buffer
    })
}

/// Waits for a spawned child, killing it after `timeout`. Returns false on kill.
pub fn wait_or_kill(child: &mut Child, timeout: Duration) -> std::io::Result<bool> {
    let start = Instant::now();
    loop {
        if child.try_wait()?.is_some() {
            return Ok(true);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(false);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> (String, Vec<String>) {
        if cfg!(windows) {
            ("cmd.exe".to_string(), vec!["/C".to_string(), script.to_string()])
        } else {
            ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
        }
    }

    #[cfg(unix)]
    #[test]
    fn large_stdout_does_not_deadlock() {
        let (program, args) = shell("i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done");
        let output = run_command_with_timeout(&program, &args, Duration::from_secs(10), "trace-large")
            .expect("large output completes");
        assert!(output.success());
        assert!(output.stdout.len() >= 1_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn captures_stderr_and_exit_code() {
        let (program, args) = shell("echo out; echo err 1>&2; exit 3");
        let output = run_command_with_timeout(&program, &args, Duration::from_secs(5), "trace-exit")
            .expect("completes");
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn times_out_and_kills_child() {
        let (program, args) = shell("sleep 30");
        let started = Instant::now();
        let err = run_command_with_timeout(&program, &args, Duration::from_millis(200), "trace-timeout")
            .expect_err("should time out");
        assert_eq!(err.code, "ERR_SYSTEM");
        assert!(err.error.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = run_command_with_timeout(
            "adb-binary-that-does-not-exist",
            &[],
            Duration::from_secs(1),
            "trace-missing",
        )
        .expect_err("spawn fails");
        assert_eq!(err.trace_id, "trace-missing");
        assert!(err.error.contains("Failed to spawn"));
    }

    #[cfg(unix)]
    #[test]
    fn spawned_child_with_noisy_stderr_runs_to_completion() {
        let adb = SystemAdb::new("sh");
        let args = vec![
            "-c".to_string(),
            "yes screenrecord-warning | head -c 1000000 1>&2".to_string(),
        ];
        let mut child = adb.spawn(&args, "trace-spawn").expect("spawn");
        let exited = wait_or_kill(&mut child, Duration::from_secs(10)).expect("wait");
        assert!(exited);
    }

    #[cfg(unix)]
    #[test]
    fn wait_or_kill_reports_kill() {
        let mut child = Command::new("sh").args(["-c", "sleep 30"]).spawn().expect("spawn");
        let exited = wait_or_kill(&mut child, Duration::from_millis(100)).expect("wait");
        assert!(!exited);
    }
}
