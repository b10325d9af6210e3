//! Mock tool runner for testing.
//!
//! Provides a configurable mock implementation of the ToolRunner trait
//! for use in unit tests without requiring an actual terraform binary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{RunConfig, ToolCommand};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ToolHandle, ToolLocation, ToolRunner};

/// Predefined mock response for a tool execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub version: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

/// Mock tool runner for testing.
///
/// Commands are answered by the first rule whose pattern occurs in the
/// space-joined arguments, then by the response queue, then with an empty
/// success.
#[derive(Clone)]
pub struct MockRunner {
    /// Error returned by `ensure_tool`, if any.
    tool_failure: Arc<RwLock<Option<String>>>,
    /// Responses keyed by an argument substring.
    rules: Arc<RwLock<Vec<(String, MockResponse)>>>,
    /// Predefined responses for unmatched run calls.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated failure to return from every run.
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self {
            tool_failure: Arc::new(RwLock::new(None)),
            rules: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Make `ensure_tool` fail as if the tool could not be installed.
    pub fn tool_unavailable(self, message: impl Into<String>) -> Self {
        *self.tool_failure.write() = Some(message.into());
        self
    }

    /// Answer commands whose arguments contain `pattern` with `response`.
    pub fn respond_to(self, pattern: impl Into<String>, response: MockResponse) -> Self {
        self.rules.write().push((pattern.into(), response));
        self
    }

    /// Add a mock response for the next unmatched run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set a failure to simulate.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    /// Arguments of every `run` call whose subcommand is `subcommand`.
    pub fn commands(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == "run" && c.args.first().map(String::as_str) == Some(subcommand))
            .map(|c| c.args.clone())
            .collect()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn next_response(&self, args: &[String]) -> MockResponse {
        let joined = args.join(" ");
        if let Some((_, response)) = self
            .rules
            .read()
            .iter()
            .find(|(pattern, _)| joined.contains(pattern.as_str()))
        {
            return response.clone();
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn ensure_tool(&self, version: &str) -> RunnerResult<ToolHandle> {
        self.record_call(CapturedCall {
            method: "ensure_tool".to_string(),
            version: version.to_string(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        });
        if let Some(msg) = self.tool_failure.read().clone() {
            return Err(RunnerError::ToolNotAvailable(msg));
        }
        Ok(ToolHandle::new(version, ToolLocation::Virtual))
    }

    async fn run(
        &self,
        handle: &ToolHandle,
        command: &ToolCommand,
        _run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.record_call(CapturedCall {
            method: "run".to_string(),
            version: handle.version.clone(),
            args: command.args.clone(),
            working_dir: Some(command.working_dir.clone()),
            env: command.env.clone(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let response = self.next_response(&command.args);
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}
