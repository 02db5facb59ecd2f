//! `adb` command lines: tokenizing, chaining with `&&`, and running them
//! against the output console.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::paths::ensure_parent_dir;
use crate::app::adb::runner::{AdbBackend, CommandOutput};
use crate::app::console::Console;
use crate::app::error::AppError;

const STEP_SEPARATOR: &str = "&&";

/// One or more `adb` argument vectors, run in order until one fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    steps: Vec<Vec<String>>,
}

impl CommandLine {
    pub fn single<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: vec![args.into_iter().map(Into::into).collect()],
        }
    }

    pub fn from_steps(steps: Vec<Vec<String>>) -> Self {
        Self { steps }
    }

    /// Parses text such as `shell screencap -p /sdcard/a.png && pull /sdcard/a.png "C:\My Shots\a.png"`.
    /// A leading `adb` word is accepted and dropped.
    pub fn parse(text: &str, trace_id: &str) -> Result<Self, AppError> {
        let tokens = tokenize(text).map_err(|message| AppError::validation(message, trace_id))?;
        if tokens.is_empty() {
            return Err(AppError::validation("command is required", trace_id));
        }

        let mut steps = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for token in tokens {
            match token {
                Token::Separator => {
                    if current.is_empty() {
                        return Err(AppError::validation("empty command before '&&'", trace_id));
                    }
                    steps.push(std::mem::take(&mut current));
                }
                Token::Word(word) => {
                    if current.is_empty() && word == "adb" {
                        continue;
                    }
                    current.push(word);
                }
            }
        }
        if current.is_empty() {
            return Err(AppError::validation("empty command after '&&'", trace_id));
        }
        steps.push(current);
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Vec<String>] {
        &self.steps
    }

    pub fn display(&self) -> String {
        self.steps
            .iter()
            .map(|step| {
                let words: Vec<String> = step.iter().map(|word| quote_for_display(word)).collect();
                format!("adb {}", words.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Runs every step; stops after the first non-zero exit.
    pub fn execute(
        &self,
        adb: &dyn AdbBackend,
        timeout: Duration,
        trace_id: &str,
    ) -> Result<CommandOutput, AppError> {
        let mut combined = CommandOutput::default();
        for step in &self.steps {
            let output = adb.run(step, timeout, trace_id)?;
            combined.stdout.push_str(&output.stdout);
            combined.stderr.push_str(&output.stderr);
            combined.exit_code = output.exit_code;
            if !output.success() {
                break;
            }
        }
        Ok(combined)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Separator,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut quote: Option<char> = None;

    let mut flush = |word: &mut String, in_word: &mut bool, quoted: &mut bool| {
        if *in_word {
            if !*quoted && word.as_str() == STEP_SEPARATOR {
                tokens.push(Token::Separator);
            } else {
                tokens.push(Token::Word(std::mem::take(word)));
            }
            word.clear();
        }
        *in_word = false;
        *quoted = false;
    };

    for ch in text.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => word.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                quoted = true;
                in_word = true;
            }
            None if ch.is_whitespace() => flush(&mut word, &mut in_word, &mut quoted),
            None => {
                word.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote in command".to_string());
    }
    flush(&mut word, &mut in_word, &mut quoted);
    Ok(tokens)
}

fn quote_for_display(word: &str) -> String {
    if word.is_empty() || word.chars().any(char::is_whitespace) {
        format!("\"{word}\"")
    } else {
        word.to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InvocationResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub output_file: Option<String>,
}

/// A command line plus where to persist its stdout. Consumed by [`run_invocation`].
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandLine,
    pub output_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(command: CommandLine, timeout: Duration) -> Self {
        Self {
            command,
            output_file: None,
            timeout,
        }
    }

    pub fn with_output_file(mut self, path: impl AsRef<Path>) -> Self {
        self.output_file = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Runs the command, persists stdout verbatim when a file is requested, and
/// appends stdout to the console. Exit status is reported, not raised.
pub fn run_invocation(
    adb: &dyn AdbBackend,
    console: &Console,
    invocation: Invocation,
    trace_id: &str,
) -> Result<InvocationResult, AppError> {
    let command = invocation.command.display();
    info!(trace_id = %trace_id, command = %command, "run invocation");
    let output = invocation.command.execute(adb, invocation.timeout, trace_id)?;
    if !output.success() {
        warn!(
            trace_id = %trace_id,
            exit_code = ?output.exit_code,
            stderr = %output.stderr.trim(),
            "adb exited unsuccessfully"
        );
    }

    let output_file = match invocation.output_file {
        Some(path) => {
            ensure_parent_dir(&path, trace_id)?;
            fs::write(&path, &output.stdout)
                .map_err(|err| AppError::io("Failed to write output file", err, trace_id))?;
            Some(path.to_string_lossy().to_string())
        }
        None => None,
    };

    console.append_line(&output.stdout);

    Ok(InvocationResult {
        command,
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.exit_code,
        output_file,
    })
}
