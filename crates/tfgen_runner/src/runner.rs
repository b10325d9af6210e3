//! Tool runner trait and types.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{RunConfig, ToolCommand};
use crate::error::RunnerResult;

/// Result of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code reported by the tool
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Result returned in dry-run mode without executing anything.
    pub fn dry_run(command_line: &str) -> Self {
        let now = Utc::now();
        Self {
            exit_code: 0,
            stdout: format!("[DRY-RUN] Command: {}", command_line),
            stderr: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Last non-empty stderr line, used in error messages.
    pub fn error_summary(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("unknown error")
    }
}

/// How a prepared tool is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolLocation {
    /// A binary on the local filesystem.
    Binary { path: PathBuf },
    /// A container image whose entrypoint is the tool.
    Image { runtime: String, image: String },
    /// Nothing real; used by dry runs and tests.
    Virtual,
}

/// A tool that was verified to be ready at a given version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHandle {
    pub version: String,
    pub location: ToolLocation,
}

impl ToolHandle {
    pub fn new(version: impl Into<String>, location: ToolLocation) -> Self {
        Self {
            version: version.into(),
            location,
        }
    }
}

/// Runs the external state-management tool.
///
/// `ensure_tool` is expected to be called once per run; the returned handle
/// is passed to every subsequent `run`.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Make the pinned `version` of the tool available.
    async fn ensure_tool(&self, version: &str) -> RunnerResult<ToolHandle>;

    /// Run one command with a prepared tool.
    async fn run(
        &self,
        handle: &ToolHandle,
        command: &ToolCommand,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str, exit_code: i64) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_combined_output() {
        assert_eq!(result("out", "", 0).combined_output(), "out");
        assert_eq!(result("", "err", 1).combined_output(), "err");
        assert_eq!(result("out", "err", 1).combined_output(), "out\nerr");
    }

    #[test]
    fn test_error_summary() {
        let r = result("", "Error: a\nError: resource not found\n\n", 1);
        assert!(!r.success());
        assert_eq!(r.error_summary(), "Error: resource not found");
        assert_eq!(result("", "", 1).error_summary(), "unknown error");
    }

    #[test]
    fn test_dry_run_result() {
        let r = ExecutionResult::dry_run("terraform init");
        assert!(r.success());
        assert!(r.stdout.contains("terraform init"));
    }
}
