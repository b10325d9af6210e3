//! Error types for generation and reconciliation.

use thiserror::Error;

use crate::reconcile::ReconciliationState;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while generating or reconciling a tenant.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] tfgen_sdk::ClientError),

    #[error("Document error: {0}")]
    Document(#[from] tfgen_hcl::HclError),

    #[error("Runner error: {0}")]
    Runner(#[from] tfgen_runner::RunnerError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of one reconciliation request, tagged with the step that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{address} ({resource_id}) failed at {step}: {message}")]
pub struct ReconciliationError {
    pub address: String,
    pub resource_id: String,
    pub step: ReconciliationState,
    pub message: String,
}
