//! Error types for the audit module.

use thiserror::Error;

use crate::record::AuditRecordId;

/// Errors that can occur while writing or reading audit records.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record with this id was already appended.
    #[error("audit record already exists: {0}")]
    Duplicate(AuditRecordId),

    /// The input cannot become a record.
    #[error("invalid audit record: {0}")]
    InvalidRecord(String),

    /// The backend cannot be reached (poisoned lock, join failure, outage).
    #[error("audit store unavailable: {0}")]
    Unavailable(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serialization(e.to_string())
    }
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
