//! Runner for a terraform binary installed on the host.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::{RunConfig, RunnerOptions, ToolCommand};
use crate::error::{RunnerError, RunnerResult};
use crate::process;
use crate::runner::{ExecutionResult, ToolHandle, ToolLocation, ToolRunner};

/// Default binary name looked up on `PATH`.
pub const DEFAULT_BINARY: &str = "terraform";

#[derive(Debug, Deserialize)]
struct VersionOutput {
    terraform_version: String,
}

/// Extract the version from `terraform version` output.
///
/// Accepts both the `-json` form and the plain `Terraform v0.14.11` banner.
pub fn parse_version_output(output: &str) -> RunnerResult<String> {
    if let Ok(parsed) = serde_json::from_str::<VersionOutput>(output) {
        return Ok(parsed.terraform_version);
    }
    output
        .lines()
        .next()
        .and_then(|line| line.trim().strip_prefix("Terraform v"))
        .map(|v| v.trim().to_string())
        .ok_or_else(|| {
            RunnerError::ExecutionFailed(format!("Unrecognised version output: {}", output.trim()))
        })
}

/// Check `terraform version` output against the pinned version.
pub fn check_version(expected: &str, output: &str) -> RunnerResult<String> {
    let found = parse_version_output(output)?;
    if found != expected {
        return Err(RunnerError::VersionMismatch {
            expected: expected.to_string(),
            found,
        });
    }
    Ok(found)
}

/// Runs a locally installed terraform binary.
pub struct LocalRunner {
    binary: PathBuf,
    options: RunnerOptions,
}

impl LocalRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            options,
        }
    }

    /// Use an explicit binary path instead of `PATH` lookup.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn program(&self) -> String {
        self.binary.to_string_lossy().to_string()
    }
}

#[async_trait]
impl ToolRunner for LocalRunner {
    async fn ensure_tool(&self, version: &str) -> RunnerResult<ToolHandle> {
        if self.options.dry_run {
            info!("[DRY-RUN] Would verify {} v{}", self.program(), version);
            return Ok(ToolHandle::new(version, ToolLocation::Virtual));
        }

        let output = process::run_simple(&self.program(), &["version", "-json"])?;
        let found = check_version(version, &output)?;

        info!("Using terraform v{} at {}", found, self.binary.display());
        Ok(ToolHandle::new(
            found,
            ToolLocation::Binary {
                path: self.binary.clone(),
            },
        ))
    }

    async fn run(
        &self,
        handle: &ToolHandle,
        command: &ToolCommand,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let program = match &handle.location {
            ToolLocation::Binary { path } => path.to_string_lossy().to_string(),
            _ => self.program(),
        };
        let cmd_str = process::format_command(&program, &command.args);
        debug!("Command: {} (in {})", cmd_str, command.working_dir.display());

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            return Ok(ExecutionResult::dry_run(&cmd_str));
        }

        let started_at = Utc::now();
        let (exit_code, stdout, stderr) = process::execute(
            &program,
            &command.args,
            Some(command.working_dir()),
            &command.env,
            run_config,
        )?;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds() as u64;

        let result = ExecutionResult {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        };

        if result.success() {
            debug!("{} completed in {}ms", cmd_str, duration_ms);
        } else {
            error!(
                "{} failed with exit code {} after {}ms",
                cmd_str, exit_code, duration_ms
            );
            if self.options.fail_fast {
                return Err(RunnerError::ExecutionFailed(format!(
                    "{} exited with code {}: {}",
                    cmd_str,
                    exit_code,
                    result.error_summary()
                )));
            }
        }

        Ok(result)
    }
}
