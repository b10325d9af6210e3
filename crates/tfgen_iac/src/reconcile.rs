//! State adoption for generated resources.
//!
//! Every [`ReconciliationRequest`] walks the same steps:
//!
//! ```text
//! Pending -> ToolReady -> StateInitialized -> Imported -> Verified
//! ```
//!
//! A failing step marks that request `Failed` and the driver moves on to
//! the next one. Tool preparation is shared by all requests and `init` runs
//! once per working directory.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use tfgen_runner::ToolHandle;

use crate::context::ReconciliationRequest;
use crate::error::ReconciliationError;
use crate::terraform::{TerraformResult, TerraformRunner};

/// Step reached by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationState {
    Pending,
    ToolReady,
    StateInitialized,
    Imported,
    Verified,
    Failed,
}

impl fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::ToolReady => "tool_ready",
            Self::StateInitialized => "state_initialized",
            Self::Imported => "imported",
            Self::Verified => "verified",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// What happened to one request.
#[derive(Debug, Clone)]
pub struct ReconciliationOutcome {
    pub request: ReconciliationRequest,
    /// Last state reached; `Verified` on success, `Failed` otherwise.
    pub state: ReconciliationState,
    /// The state snapshot printed after the import, or the failure.
    pub result: Result<serde_json::Value, ReconciliationError>,
}

impl ReconciliationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of all outcomes, in submission order.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub outcomes: Vec<ReconciliationOutcome>,
}

impl ReconciliationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: ReconciliationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn errors(&self) -> impl Iterator<Item = &ReconciliationError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

/// Runs reconciliation requests one at a time, isolating failures.
pub struct ReconciliationDriver {
    terraform: TerraformRunner,
    handle: Option<ToolHandle>,
    initialized: HashSet<PathBuf>,
}

impl ReconciliationDriver {
    pub fn new(terraform: TerraformRunner) -> Self {
        Self {
            terraform,
            handle: None,
            initialized: HashSet::new(),
        }
    }

    /// Reconcile `requests` in order.
    pub async fn run(&mut self, requests: &[ReconciliationRequest]) -> ReconciliationReport {
        let mut report = ReconciliationReport::new();
        for request in requests {
            let outcome = self.reconcile(request).await;
            match &outcome.result {
                Ok(_) => info!("Adopted {} ({})", request.address, request.resource_id),
                Err(e) => error!("{}", e),
            }
            report.add(outcome);
        }
        if !requests.is_empty() {
            info!(
                "Reconciliation finished: {} adopted, {} failed",
                report.succeeded(),
                report.failed()
            );
        }
        report
    }

    /// Drive a single request through every step.
    pub async fn reconcile(&mut self, request: &ReconciliationRequest) -> ReconciliationOutcome {
        match self.advance(request).await {
            Ok(snapshot) => ReconciliationOutcome {
                request: request.clone(),
                state: ReconciliationState::Verified,
                result: Ok(snapshot),
            },
            Err((step, message)) => ReconciliationOutcome {
                request: request.clone(),
                state: ReconciliationState::Failed,
                result: Err(ReconciliationError {
                    address: request.address.clone(),
                    resource_id: request.resource_id.clone(),
                    step,
                    message,
                }),
            },
        }
    }

    /// Returns the snapshot, or the step that failed with a message.
    async fn advance(
        &mut self,
        request: &ReconciliationRequest,
    ) -> Result<serde_json::Value, (ReconciliationState, String)> {
        let handle = self
            .tool()
            .await
            .map_err(|e| (ReconciliationState::ToolReady, e))?;
        let dir = request.working_dir.as_path();

        if !self.initialized.contains(dir) {
            let init = self
                .terraform
                .init(&handle, dir)
                .await
                .map_err(|e| (ReconciliationState::StateInitialized, e.to_string()))?;
            check(ReconciliationState::StateInitialized, &init)?;
            self.initialized.insert(dir.to_path_buf());
        }

        let import = self
            .terraform
            .import(&handle, dir, &request.address, &request.resource_id)
            .await
            .map_err(|e| (ReconciliationState::Imported, e.to_string()))?;
        check(ReconciliationState::Imported, &import)?;

        let show = self
            .terraform
            .show(&handle, dir)
            .await
            .map_err(|e| (ReconciliationState::Verified, e.to_string()))?;
        check(ReconciliationState::Verified, &show)?;

        let snapshot = snapshot(&show.stdout);
        debug!("State after importing {}: {}", request.address, snapshot);
        Ok(snapshot)
    }

    /// The tool handle, prepared on first use. A failure is retried by the
    /// next request.
    async fn tool(&mut self) -> Result<ToolHandle, String> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }
        let handle = self.terraform.ensure().await.map_err(|e| e.to_string())?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }
}

fn check(step: ReconciliationState, result: &TerraformResult) -> Result<(), (ReconciliationState, String)> {
    if result.success {
        return Ok(());
    }
    let message = result
        .output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown error")
        .to_string();
    Err((step, format!("exit code {}: {}", result.exit_code, message)))
}

/// The `values` part of `terraform show -json`, or the whole document when
/// it has none. Non-JSON output is kept as a string.
fn snapshot(stdout: &str) -> serde_json::Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return serde_json::Value::Null;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(mut json) => match json.get_mut("values") {
            Some(values) => values.take(),
            None => json,
        },
        Err(e) => {
            warn!("terraform show did not print JSON: {}", e);
            serde_json::Value::String(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tfgen_runner::{MockResponse, MockRunner};

    fn driver(mock: &MockRunner) -> ReconciliationDriver {
        ReconciliationDriver::new(TerraformRunner::new(Arc::new(mock.clone())))
    }

    fn request(address: &str, id: &str, dir: &str) -> ReconciliationRequest {
        ReconciliationRequest::new(address, id, dir)
    }

    #[tokio::test]
    async fn test_happy_path_reaches_verified() {
        let mock = MockRunner::new().respond_to(
            "show",
            MockResponse::success(r#"{"format_version":"0.1","values":{"root_module":{}}}"#),
        );
        let mut driver = driver(&mock);

        let outcome = driver.reconcile(&request("a.one", "1", "/w")).await;
        assert_eq!(outcome.state, ReconciliationState::Verified);
        assert_eq!(outcome.result.unwrap(), serde_json::json!({"root_module": {}}));
    }

    #[tokio::test]
    async fn test_init_once_per_directory_and_tool_once() {
        let mock = MockRunner::new();
        let mut driver = driver(&mock);
        let requests = vec![
            request("a.one", "1", "/w/tenant"),
            request("a.two", "2", "/w/tenant"),
            request("b.one", "3", "/w/app"),
        ];

        let report = driver.run(&requests).await;
        assert_eq!(report.succeeded(), 3);
        assert_eq!(mock.commands("init").len(), 2);
        assert_eq!(
            mock.get_calls().iter().filter(|c| c.method == "ensure_tool").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_import_is_isolated() {
        let mock = MockRunner::new().respond_to(
            "import -input=false -no-color a.two",
            MockResponse::failure(1, "Error: Cannot import non-existent remote object"),
        );
        let mut driver = driver(&mock);
        let requests = vec![
            request("a.one", "1", "/w"),
            request("a.two", "2", "/w"),
            request("a.three", "3", "/w"),
        ];

        let report = driver.run(&requests).await;
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);

        let failed = &report.outcomes[1];
        assert_eq!(failed.state, ReconciliationState::Failed);
        let err = failed.result.as_ref().unwrap_err();
        assert_eq!(err.step, ReconciliationState::Imported);
        assert_eq!(err.resource_id, "2");
        assert!(err.message.contains("non-existent"));

        let imported: Vec<_> = mock
            .commands("import")
            .into_iter()
            .map(|args| (args[3].clone(), args[4].clone()))
            .collect();
        assert_eq!(
            imported,
            vec![
                ("a.one".to_string(), "1".to_string()),
                ("a.two".to_string(), "2".to_string()),
                ("a.three".to_string(), "3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_failure_marks_every_request() {
        let mock = MockRunner::new().tool_unavailable("terraform not found");
        let mut driver = driver(&mock);

        let report = driver
            .run(&[request("a.one", "1", "/w"), request("a.two", "2", "/w")])
            .await;
        assert_eq!(report.failed(), 2);
        assert!(report.errors().all(|e| e.step == ReconciliationState::ToolReady));
        assert!(mock.commands("import").is_empty());
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let mock = MockRunner::new()
            .respond_to("init", MockResponse::failure(1, "Error: registry unreachable"));
        let mut driver = driver(&mock);

        let report = driver
            .run(&[request("a.one", "1", "/w"), request("a.two", "2", "/w")])
            .await;
        assert_eq!(report.failed(), 2);
        assert_eq!(mock.commands("init").len(), 2);
        assert_eq!(
            report.errors().next().map(|e| e.step),
            Some(ReconciliationState::StateInitialized)
        );
    }

    #[test]
    fn test_snapshot_parsing() {
        assert_eq!(snapshot(""), serde_json::Value::Null);
        assert_eq!(snapshot(r#"{"format_version":"0.1"}"#)["format_version"], "0.1");
        assert_eq!(snapshot("No state."), serde_json::Value::from("No state."));
    }
}
