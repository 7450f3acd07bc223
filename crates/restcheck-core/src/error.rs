//! Error taxonomy for suite loading and contract execution.
//!
//! Only [`SuiteError`] is fatal: a statically invalid suite aborts the run
//! before any network call. Transport and validation failures are recovered
//! into per-contract results by the executor.

/// Errors raised while loading or validating a suite file.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("malformed contract `{name}`: {reason}")]
    MalformedContract { name: String, reason: String },

    #[error("invalid schema on contract `{name}`: {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("suite contains no contracts")]
    EmptySuite,

    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to parse suite file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network-level failures from a transport.
///
/// These never propagate past the executor; they become the
/// `transport error: ...` reason on a failed result.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Http(String),
}

/// A schema validation failure, carrying the validator's message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable description of the first violation.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for suite-level operations.
pub type Result<T> = std::result::Result<T, SuiteError>;
