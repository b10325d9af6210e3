//! Subprocess execution shared by the local and container runners.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};

/// Output stream of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Format a command line for logging.
pub fn format_command(program: &str, args: &[String]) -> String {
    let mut cmd = program.to_string();
    for arg in args {
        if arg.contains(' ') || arg.contains('=') {
            cmd.push_str(&format!(" '{}'", arg));
        } else {
            cmd.push_str(&format!(" {}", arg));
        }
    }
    cmd
}

fn collect<R: Read + Send + 'static>(
    reader: R,
    stream: LogStream,
    stream_logs: bool,
) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut output = String::new();
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            if stream_logs {
                info!(%stream, "{}", line);
            }
            output.push_str(&line);
            output.push('\n');
        }
        output
    })
}

/// Run `program` to completion, capturing both streams.
///
/// Returns `(exit_code, stdout, stderr)`. A process that outlives
/// `run_config.timeout_seconds` is killed and reported as a timeout.
pub fn execute(
    program: &str,
    args: &[String],
    working_dir: Option<&Path>,
    env: &BTreeMap<String, String>,
    run_config: &RunConfig,
) -> RunnerResult<(i64, String, String)> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    debug!("Executing: {}", format_command(program, args));

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::ToolNotAvailable(format!("{}: {}", program, e))
        } else {
            RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", program, e))
        }
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

    let stdout_handle = collect(stdout, LogStream::Stdout, run_config.stream_logs);
    let stderr_handle = collect(stderr, LogStream::Stderr, run_config.stream_logs);

    let status = if run_config.timeout_seconds > 0 {
        let timeout = Duration::from_secs(run_config.timeout_seconds);
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(RunnerError::Timeout(run_config.timeout_seconds));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(RunnerError::ExecutionFailed(format!(
                        "Failed to wait for process: {}",
                        e
                    )));
                }
            }
        }
    } else {
        child.wait().map_err(|e| {
            RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
        })?
    };

    let stdout_output = stdout_handle.join().unwrap_or_default();
    let stderr_output = stderr_handle.join().unwrap_or_default();

    let exit_code = status.code().unwrap_or(-1) as i64;

    Ok((exit_code, stdout_output, stderr_output))
}

/// Run a short command and return its stdout, failing on a non-zero exit.
pub fn run_simple(program: &str, args: &[&str]) -> RunnerResult<String> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::ToolNotAvailable(format!("{}: {}", program, e))
        } else {
            RunnerError::ExecutionFailed(e.to_string())
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(RunnerError::ExecutionFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }
}
