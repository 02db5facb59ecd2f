use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use adb_toolbox_lib::app::adb::locator::{normalize_command_path, resolve_adb_program, validate_adb_program};
use adb_toolbox_lib::app::adb::runner::SystemAdb;
use adb_toolbox_lib::app::config::{load_config, AppConfig};
use adb_toolbox_lib::app::console::{Console, ConsoleEvent};
use adb_toolbox_lib::app::error::AppError;
use adb_toolbox_lib::app::logging::init_logging;
use adb_toolbox_lib::app::sampling::monitor::{
    check_sampling_inputs, sleep_interruptible, SamplingOutcome, SamplingRun,
};
use adb_toolbox_lib::app::sampling::parse::SignalParser;
use adb_toolbox_lib::app::sampling::SampleKind;
use adb_toolbox_lib::app::system_info::{self, SystemInfoKind};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "adb-connectivity", version, about = "Poll cellular and WiFi metrics over adb")]
struct Cli {
    #[arg(long, global = true, help = "Path to the adb executable (defaults to config, then PATH)")]
    adb: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample telephony.registry for signal strength and cell identity.
    Cellular {
        #[arg(long, help = "Seconds between samples")]
        interval: Option<String>,
        #[arg(long, help = "Number of samples")]
        repeat: Option<String>,
    },
    /// Sample the wifi service for SSID, BSSID, frequency, RSSI and link speed.
    Wifi {
        #[arg(long, help = "Seconds between samples")]
        interval: Option<String>,
        #[arg(long, help = "Number of samples")]
        repeat: Option<String>,
    },
    /// Save one getprop/dumpsys capture into the output directory.
    Capture {
        id: String,
        #[arg(long, help = "Directory for the capture file")]
        out: Option<PathBuf>,
    },
    /// List the capture ids accepted by `capture`.
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();
    let config = load_config(&trace_id).unwrap_or_else(|err| {
        eprintln!("{err}");
        AppConfig::default()
    });
    init_logging(&config.logging.log_level);

    match run(cli, &config, &trace_id) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &AppConfig, trace_id: &str) -> Result<ExitCode, AppError> {
    let console = Console::new(config.console.max_chars);
    console.set_listener(Arc::new(|event| {
        if let ConsoleEvent::Appended { text } = event {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }));

    match cli.command {
        Commands::List => {
            for kind in SystemInfoKind::ALL {
                println!("{:<18} {}", kind.id(), kind.description());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Capture { id, out } => {
            let kind = system_info::parse_kind(&id, trace_id)?;
            let adb = adb_backend(cli.adb.as_deref(), config, trace_id)?;
            let output_dir = out.unwrap_or_else(|| config.output.output_dir_path());
            let result = system_info::capture_system_info(
                &adb,
                &console,
                kind,
                &output_dir,
                config.adb.command_timeout(),
                trace_id,
            )?;
            Ok(exit_code(result.exit_code == Some(0)))
        }
        Commands::Cellular { interval, repeat } => {
            sample(SampleKind::Cellular, interval, repeat, cli.adb.as_deref(), config, &console, trace_id)
        }
        Commands::Wifi { interval, repeat } => {
            sample(SampleKind::Wifi, interval, repeat, cli.adb.as_deref(), config, &console, trace_id)
        }
    }
}

fn sample(
    kind: SampleKind,
    interval: Option<String>,
    repeat: Option<String>,
    adb_override: Option<&str>,
    config: &AppConfig,
    console: &Console,
    trace_id: &str,
) -> Result<ExitCode, AppError> {
    let interval = interval.unwrap_or_else(|| config.sampling.default_interval_secs.to_string());
    let repeat = repeat.unwrap_or_else(|| config.sampling.default_repeat.to_string());
    let Ok(plan) = check_sampling_inputs(console, &interval, &repeat, trace_id) else {
        return Ok(ExitCode::from(2));
    };

    let adb = adb_backend(adb_override, config, trace_id)?;
    let parser = SignalParser::default();
    let stop_flag = AtomicBool::new(false);
    let summary = SamplingRun {
        kind,
        plan,
        adb: &adb,
        console,
        parser: &parser,
        stop_flag: &stop_flag,
        timeout: config.adb.command_timeout(),
        trace_id,
    }
    .run(sleep_interruptible);

    Ok(exit_code(summary.outcome != SamplingOutcome::AdbFailed))
}

fn adb_backend(adb_override: Option<&str>, config: &AppConfig, trace_id: &str) -> Result<SystemAdb, AppError> {
    let program = adb_override
        .map(normalize_command_path)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| resolve_adb_program(&config.adb.command_path));
    validate_adb_program(&program).map_err(|message| AppError::dependency(message, trace_id))?;
    Ok(SystemAdb::new(program))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
