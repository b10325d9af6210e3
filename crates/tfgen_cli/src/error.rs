//! Errors the CLI maps to dedicated exit codes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{skipped} resource(s) could not be generated")]
    GenerationFailed { skipped: usize },

    #[error("{failed} resource(s) could not be imported")]
    ReconciliationFailed { failed: usize },
}
