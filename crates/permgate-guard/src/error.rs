//! Rejections and session errors.

use serde::Serialize;
use thiserror::Error;

/// A terminal authorization outcome.
///
/// Handlers must turn this into a response immediately and perform no
/// domain mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// No valid principal for this request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// A principal exists but lacks what the operation requires.
    #[error("forbidden: {message}")]
    Forbidden { message: String },
}

impl Rejection {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Rejection::Forbidden {
            message: message.into(),
        }
    }

    /// Forbidden for lack of any of `required`.
    pub fn missing_permission<R: AsRef<str>>(required: &[R]) -> Self {
        let names: Vec<&str> = required.iter().map(AsRef::as_ref).collect();
        Self::forbidden(format!("Required permission: {}", names.join(" or ")))
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Rejection::Unauthenticated)
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Rejection::Forbidden { .. })
    }

    /// HTTP status code: 401 or 403.
    pub fn status_code(&self) -> u16 {
        match self {
            Rejection::Unauthenticated => 401,
            Rejection::Forbidden { .. } => 403,
        }
    }

    /// The JSON response a handler sends for this rejection.
    pub fn to_response(&self) -> ErrorResponse {
        let body = match self {
            Rejection::Unauthenticated => ErrorBody {
                error: "Unauthorized".to_string(),
                message: None,
            },
            Rejection::Forbidden { message } => ErrorBody {
                error: "Forbidden".to_string(),
                message: Some(message.clone()),
            },
        };
        ErrorResponse {
            status: self.status_code(),
            body,
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: ErrorBody,
}

/// Failure inside a session backend.
///
/// Never escapes a [`SessionResolver`](crate::SessionResolver): resolvers
/// log it and treat the request as unauthenticated.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),
}
