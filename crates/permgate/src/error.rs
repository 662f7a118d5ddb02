//! Error types for guarded request handling.

use permgate_audit::AuditError;
use permgate_guard::{ErrorBody, ErrorResponse, Rejection};
use thiserror::Error;

/// Errors surfaced by [`RequestScope`](crate::RequestScope) operations.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The guard rejected the request.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The target resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Audit storage failed. Only surfaced under the `required` policy or
    /// for audit reads.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    /// The guarded operation itself failed.
    #[error("operation failed: {0}")]
    Operation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AuthzError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            AuthzError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.rejection().is_some_and(Rejection::is_forbidden)
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.rejection().is_some_and(Rejection::is_unauthenticated)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::Rejected(rejection) => rejection.status_code(),
            AuthzError::NotFound(_) => 404,
            AuthzError::Audit(_) | AuthzError::Operation(_) | AuthzError::Config(_) => 500,
        }
    }

    /// Response body for this error. Internal details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            AuthzError::Rejected(rejection) => return rejection.to_response(),
            AuthzError::NotFound(what) => what.clone(),
            _ => "Internal server error".to_string(),
        };
        ErrorResponse {
            status: self.status_code(),
            body: ErrorBody {
                error,
                message: None,
            },
        }
    }
}

/// Result type for guarded operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
