//! Error types for discovery calls.

use thiserror::Error;

/// Result type alias for discovery calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by a [`DiscoveryClient`](crate::DiscoveryClient).
///
/// Callers usually only care whether data is missing (`NotFound`) or the
/// call itself failed; both are treated as "unavailable" for auxiliary
/// lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{api}: not found")]
    NotFound { api: String },

    #[error("{api}: unauthorized ({status})")]
    Unauthorized { api: String, status: u16 },

    #[error("{api}: HTTP {status}: {message}")]
    Status {
        api: String,
        status: u16,
        message: String,
    },

    #[error("{api}: transport error: {message}")]
    Transport { api: String, message: String },

    #[error("{api}: cannot decode response: {message}")]
    Decode { api: String, message: String },

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ClientError {
    pub fn not_found(api: impl Into<String>) -> Self {
        Self::NotFound { api: api.into() }
    }

    pub fn transport(api: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            api: api.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map an HTTP status to an error.
    pub fn from_status(api: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let api = api.into();
        match status {
            404 => Self::NotFound { api },
            401 | 403 => Self::Unauthorized { api, status },
            _ => Self::Status {
                api,
                status,
                message: body.into(),
            },
        }
    }
}
