//! Error types for signature session operations.
//!
//! Local failures (configuration, validation, state) never touch the network.
//! Remote failures carry what the service answered so callers can diagnose
//! them without re-issuing the call.

use crate::domain::validation::ValidationResults;
use thiserror::Error;

/// Result type for client operations
pub type RestPkiResult<T> = Result<T, RestPkiError>;

/// Error taxonomy for the signing service client
#[derive(Error, Debug, miette::Diagnostic)]
pub enum RestPkiError {
    #[error("Configuration error: {0}")]
    #[diagnostic(help("check the endpoint and access token in your configuration file"))]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    InvalidStateError(String),

    #[error("Remote service returned HTTP {status} for {verb} {path}: {body}")]
    RemoteServiceError {
        verb: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Remote service rejected {verb} {path}: {results}")]
    RemoteValidationError {
        verb: &'static str,
        path: String,
        results: Box<ValidationResults>,
    },

    #[error("Remote service error on {verb} {path}: {code}{}", detail_suffix(.detail))]
    ServiceError {
        verb: &'static str,
        path: String,
        code: String,
        detail: Option<String>,
    },

    #[error("Transport error: {0}")]
    #[diagnostic(help("the signing service could not be reached; check connectivity and timeout"))]
    TransportError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(" ({d})"),
        _ => String::new(),
    }
}

impl RestPkiError {
    /// True when the failure happened before any request left the process.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            RestPkiError::ConfigurationError(_)
                | RestPkiError::ValidationError(_)
                | RestPkiError::InvalidStateError(_)
                | RestPkiError::IoError(_)
        )
    }

    /// HTTP status reported by the service, if the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            RestPkiError::RemoteServiceError { status, .. } => Some(*status),
            RestPkiError::RemoteValidationError { .. } | RestPkiError::ServiceError { .. } => {
                Some(422)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RestPkiError {
    fn from(error: reqwest::Error) -> Self {
        RestPkiError::TransportError(error.to_string())
    }
}

impl From<std::io::Error> for RestPkiError {
    fn from(error: std::io::Error) -> Self {
        RestPkiError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for RestPkiError {
    fn from(error: serde_json::Error) -> Self {
        RestPkiError::DecodeError(format!("invalid JSON: {error}"))
    }
}

impl From<base64::DecodeError> for RestPkiError {
    fn from(error: base64::DecodeError) -> Self {
        RestPkiError::DecodeError(format!("invalid base64: {error}"))
    }
}
