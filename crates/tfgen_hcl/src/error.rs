//! Error types for the document model.

use thiserror::Error;

/// Result type alias for document operations.
pub type HclResult<T> = Result<T, HclError>;

/// Errors that can occur while building, validating or formatting a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HclError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid reference: {0:?}")]
    InvalidReference(String),

    #[error("Duplicate block: {0}")]
    DuplicateBlock(String),

    #[error("HCL formatting failed: {0}")]
    Format(String),
}

impl From<hcl::Error> for HclError {
    fn from(err: hcl::Error) -> Self {
        HclError::Format(err.to_string())
    }
}
