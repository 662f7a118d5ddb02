//! Error types for permgate core.

use thiserror::Error;

/// A permission string that does not follow the `resource:action:scope` grammar.
///
/// Only the strict parser raises this. The matcher never does: a malformed
/// string there degrades to exact comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("empty permission string")]
    Empty,

    #[error("permission {input:?} has {parts} colon-delimited parts, expected 3")]
    WrongArity { input: String, parts: usize },

    #[error("permission {input:?} has an empty {position} segment")]
    EmptySegment {
        input: String,
        position: &'static str,
    },

    #[error("permission {0:?} contains whitespace or non-ASCII characters")]
    InvalidCharacter(String),
}

/// Errors raised by role catalog operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("role {0} is a system role and cannot be deleted")]
    SystemRole(String),

    #[error("role {0} already exists")]
    DuplicateRole(String),

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
