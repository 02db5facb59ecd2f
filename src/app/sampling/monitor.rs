use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::runner::AdbBackend;
use crate::app::console::Console;
use crate::app::error::AppError;

use super::parse::SignalParser;
use super::{render_cycle, SampleKind};

pub const INVALID_INPUT_MESSAGE: &str = "Please enter valid numbers for interval and repeat values.";
pub const ADB_FAILURE_MESSAGE: &str =
    "Failed to execute adb command. Ensure that adb is installed and the device is connected.";

const PAUSE_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplingPlan {
    pub interval_secs: u64,
    pub repeat: u64,
}

impl SamplingPlan {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Parses the two UI fields. Both must be whole numbers; the interval must
/// not be negative, and a negative repeat count means no cycles.
pub fn parse_sampling_inputs(interval: &str, repeat: &str, trace_id: &str) -> Result<SamplingPlan, AppError> {
    match (interval.trim().parse::<u64>(), repeat.trim().parse::<i64>()) {
        (Ok(interval_secs), Ok(repeat)) => Ok(SamplingPlan {
            interval_secs,
            repeat: u64::try_from(repeat).unwrap_or(0),
        }),
        _ => Err(AppError::validation(INVALID_INPUT_MESSAGE, trace_id)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingOutcome {
    Completed,
    Stopped,
    AdbFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingSummary {
    pub kind: SampleKind,
    pub cycles_completed: u64,
    pub outcome: SamplingOutcome,
}

/// One polling loop. `run` blocks; [`spawn_sampling`] puts it on a thread.
pub struct SamplingRun<'a> {
    pub kind: SampleKind,
    pub plan: SamplingPlan,
    pub adb: &'a dyn AdbBackend,
    pub console: &'a Console,
    pub parser: &'a SignalParser,
    pub stop_flag: &'a AtomicBool,
    pub timeout: Duration,
    pub trace_id: &'a str,
}

impl SamplingRun<'_> {
    /// Performs `plan.repeat` cycles with `pause` between consecutive ones.
    pub fn run(&self, mut pause: impl FnMut(Duration, &AtomicBool)) -> SamplingSummary {
        let args = self.kind.args();
        let mut cycles_completed = 0;

        for cycle in 0..self.plan.repeat {
            if cycle > 0 {
                pause(self.plan.interval(), self.stop_flag);
            }
            if self.stop_flag.load(Ordering::Relaxed) {
                return self.summary(cycles_completed, SamplingOutcome::Stopped);
            }

            let raw = match self.adb.run(&args, self.timeout, self.trace_id) {
                Ok(output) if output.success() => output.stdout,
                Ok(output) => {
                    warn!(
                        trace_id = %self.trace_id,
                        kind = self.kind.id(),
                        exit_code = ?output.exit_code,
                        stderr = %output.stderr.trim(),
                        "sampling command failed"
                    );
                    self.console.append_line(ADB_FAILURE_MESSAGE);
                    return self.summary(cycles_completed, SamplingOutcome::AdbFailed);
                }
                Err(err) => {
                    warn!(trace_id = %self.trace_id, kind = self.kind.id(), error = %err.error, "sampling command failed");
                    self.console.append_line(ADB_FAILURE_MESSAGE);
                    return self.summary(cycles_completed, SamplingOutcome::AdbFailed);
                }
            };

            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let (text, rows) = render_cycle(self.kind, self.parser, &raw, &timestamp);
            self.console.append(&text);
            cycles_completed += 1;
            info!(trace_id = %self.trace_id, kind = self.kind.id(), cycle = cycles_completed, rows, "sample recorded");
        }

        self.summary(cycles_completed, SamplingOutcome::Completed)
    }

    fn summary(&self, cycles_completed: u64, outcome: SamplingOutcome) -> SamplingSummary {
        SamplingSummary {
            kind: self.kind,
            cycles_completed,
            outcome,
        }
    }
}

/// Sleeps for `duration` in short slices, returning early once `stop_flag` is set.
pub fn sleep_interruptible(duration: Duration, stop_flag: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(PAUSE_SLICE));
    }
}

pub struct SamplingHandle {
    pub id: String,
    pub kind: SampleKind,
    stop_flag: Arc<AtomicBool>,
    thread: JoinHandle<SamplingSummary>,
}

impl SamplingHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> Option<SamplingSummary> {
        self.thread.join().ok()
    }
}

pub fn spawn_sampling(
    kind: SampleKind,
    plan: SamplingPlan,
    adb: Arc<dyn AdbBackend>,
    console: Arc<Console>,
    timeout: Duration,
    trace_id: String,
) -> SamplingHandle {
    let id = Uuid::new_v4().to_string();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_thread = Arc::clone(&stop_flag);
    let thread_id = id.clone();

    let thread = thread::spawn(move || {
        let parser = SignalParser::default();
        let run = SamplingRun {
            kind,
            plan,
            adb: adb.as_ref(),
            console: console.as_ref(),
            parser: &parser,
            stop_flag: stop_thread.as_ref(),
            timeout,
            trace_id: &trace_id,
        };
        let summary = run.run(sleep_interruptible);
        info!(
            trace_id = %trace_id,
            sampler = %thread_id,
            outcome = ?summary.outcome,
            cycles = summary.cycles_completed,
            "sampling finished"
        );
        summary
    });

    SamplingHandle {
        id,
        kind,
        stop_flag,
        thread,
    }
}

/// [`parse_sampling_inputs`], echoing the validation message to the console
/// on failure.
pub fn check_sampling_inputs(
    console: &Console,
    interval: &str,
    repeat: &str,
    trace_id: &str,
) -> Result<SamplingPlan, AppError> {
    parse_sampling_inputs(interval, repeat, trace_id).inspect_err(|_| {
        warn!(trace_id = %trace_id, interval, repeat, "invalid sampling input");
        console.append_line(INVALID_INPUT_MESSAGE);
    })
}

/// Starts a background loop for an already validated plan.
pub fn start_sampling(
    registry: &Mutex<HashMap<String, SamplingHandle>>,
    kind: SampleKind,
    plan: SamplingPlan,
    adb: Arc<dyn AdbBackend>,
    console: Arc<Console>,
    timeout: Duration,
    trace_id: &str,
) -> Result<String, AppError> {
    let mut guard = registry
        .lock()
        .map_err(|_| AppError::system("Sampling registry locked", trace_id))?;
    guard.retain(|_, handle| !handle.is_finished());

    info!(trace_id = %trace_id, kind = kind.id(), interval = plan.interval_secs, repeat = plan.repeat, "start sampling");
    let handle = spawn_sampling(kind, plan, adb, console, timeout, trace_id.to_string());
    let id = handle.id.clone();
    guard.insert(id.clone(), handle);
    Ok(id)
}

/// Signals every running loop to stop; returns how many were signalled.
pub fn stop_sampling(registry: &Mutex<HashMap<String, SamplingHandle>>, trace_id: &str) -> Result<usize, AppError> {
    let mut guard = registry
        .lock()
        .map_err(|_| AppError::system("Sampling registry locked", trace_id))?;
    guard.retain(|_, handle| !handle.is_finished());
    for handle in guard.values() {
        handle.stop();
    }
    info!(trace_id = %trace_id, count = guard.len(), "stop sampling");
    Ok(guard.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adb::invocation::testing::{failed, ok, ScriptedAdb};

    const WIFI_DUMP: &str = "\
mWifiInfo SSID: \"Lab\", BSSID: 02:00:00:00:00:01, RSSI: -51, Link speed: 433, Frequency: 5745
 RSSI: -67
 RSSI: -74
";

    fn run_with(adb: &ScriptedAdb, kind: SampleKind, plan: SamplingPlan, console: &Console) -> (SamplingSummary, Vec<usize>) {
        let parser = SignalParser::default();
        let stop = AtomicBool::new(false);
        let mut pauses = Vec::new();
        let summary = SamplingRun {
            kind,
            plan,
            adb,
            console,
            parser: &parser,
            stop_flag: &stop,
            timeout: Duration::from_secs(1),
            trace_id: "t",
        }
        .run(|interval, _| {
            assert_eq!(interval, plan.interval());
            pauses.push(adb.calls().len());
        });
        (summary, pauses)
    }

    #[test]
    fn rejects_non_integer_inputs() {
        for (interval, repeat) in [("abc", "3"), ("5", ""), ("1.5", "2"), ("-1", "2"), ("2", "1.5")] {
            let err = parse_sampling_inputs(interval, repeat, "trace-input").expect_err(interval);
            assert!(err.is_validation());
            assert_eq!(err.error, INVALID_INPUT_MESSAGE);
        }
        assert_eq!(
            parse_sampling_inputs(" 2 ", "10", "t").expect("valid"),
            SamplingPlan {
                interval_secs: 2,
                repeat: 10
            }
        );
    }

    #[test]
    fn negative_repeat_means_no_cycles() {
        assert_eq!(
            parse_sampling_inputs("2", "-3", "t").expect("valid"),
            SamplingPlan {
                interval_secs: 2,
                repeat: 0
            }
        );
    }

    #[test]
    fn invalid_input_is_echoed_to_the_console() {
        let console = Console::new(10_000);
        let err = check_sampling_inputs(&console, "five", "3", "trace-invalid").expect_err("invalid");
        assert_eq!(err.trace_id, "trace-invalid");
        assert_eq!(console.snapshot(), format!("{INVALID_INPUT_MESSAGE}\n"));

        let plan = check_sampling_inputs(&console, "1", "2", "t").expect("valid");
        assert_eq!(plan.repeat, 2);
        assert_eq!(console.snapshot(), format!("{INVALID_INPUT_MESSAGE}\n"));
    }

    #[test]
    fn performs_exactly_repeat_cycles_with_pauses_between() {
        let adb = ScriptedAdb::repeating(WIFI_DUMP);
        let console = Console::new(100_000);
        let plan = SamplingPlan {
            interval_secs: 7,
            repeat: 4,
        };

        let (summary, pauses) = run_with(&adb, SampleKind::Wifi, plan, &console);

        assert_eq!(summary.outcome, SamplingOutcome::Completed);
        assert_eq!(summary.cycles_completed, 4);
        assert_eq!(adb.calls().len(), 4);
        assert!(adb.calls().iter().all(|call| *call == SampleKind::Wifi.args()));
        // Cycle n+1 starts only after the pause that follows cycle n.
        assert_eq!(pauses, vec![1, 2, 3]);

        let log = console.snapshot();
        assert_eq!(log.matches("Link Speed").count(), 4);
        assert_eq!(log.lines().filter(|line| line.starts_with("\"Lab\",")).count(), 4);
        assert_eq!(log.lines().filter(|line| line.contains("-74")).count(), 4);
    }

    #[test]
    fn zero_repeat_runs_nothing() {
        let adb = ScriptedAdb::repeating(WIFI_DUMP);
        let console = Console::new(10_000);
        let plan = SamplingPlan {
            interval_secs: 1,
            repeat: 0,
        };
        let (summary, pauses) = run_with(&adb, SampleKind::Wifi, plan, &console);
        assert_eq!(summary.cycles_completed, 0);
        assert!(pauses.is_empty());
        assert!(adb.calls().is_empty());
    }

    #[test]
    fn non_zero_exit_halts_the_loop() {
        let adb = ScriptedAdb::new()
            .push(Ok(ok("SignalStrength: 4 NetworkType: 13 DataState: 2")))
            .push(Ok(failed(1, "error: no devices/emulators found")))
            .push(Ok(ok("SignalStrength: 4")));
        let console = Console::new(10_000);
        let plan = SamplingPlan {
            interval_secs: 0,
            repeat: 5,
        };

        let (summary, _) = run_with(&adb, SampleKind::Cellular, plan, &console);

        assert_eq!(summary.outcome, SamplingOutcome::AdbFailed);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(adb.calls().len(), 2);
        assert!(console.snapshot().ends_with(&format!("{ADB_FAILURE_MESSAGE}\n")));
    }

    #[test]
    fn spawn_error_halts_the_loop() {
        let adb = ScriptedAdb::new().push(Err(AppError::system("Failed to spawn command: not found", "t")));
        let console = Console::new(10_000);
        let plan = SamplingPlan {
            interval_secs: 0,
            repeat: 3,
        };
        let (summary, _) = run_with(&adb, SampleKind::Cellular, plan, &console);
        assert_eq!(summary.outcome, SamplingOutcome::AdbFailed);
        assert_eq!(summary.cycles_completed, 0);
    }

    #[test]
    fn stop_request_ends_a_long_pause() {
        let registry = Mutex::new(HashMap::new());
        let console = Arc::new(Console::new(10_000));
        let adb = Arc::new(ScriptedAdb::repeating("SignalStrength: 2"));

        start_sampling(
            &registry,
            SampleKind::Cellular,
            SamplingPlan {
                interval_secs: 3600,
                repeat: 5,
            },
            adb.clone(),
            Arc::clone(&console),
            Duration::from_secs(1),
            "t",
        )
        .expect("start");

        // Wait for the first cycle, which runs immediately.
        let started = Instant::now();
        while adb.calls().is_empty() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(stop_sampling(&registry, "t").expect("stop"), 1);

        let handle = registry
            .lock()
            .expect("registry")
            .drain()
            .map(|(_, handle)| handle)
            .next()
            .expect("handle");
        let summary = handle.join().expect("summary");
        assert_eq!(summary.outcome, SamplingOutcome::Stopped);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(adb.calls().len(), 1);
    }

    #[test]
    fn sleep_interruptible_returns_immediately_when_stopped() {
        let stop = AtomicBool::new(true);
        let started = Instant::now();
        sleep_interruptible(Duration::from_secs(30), &stop);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
