//! SQLite implementation of the AuditStore trait.
//!
//! This is the primary storage backend for audit records. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use permgate_core::PrincipalId;

use crate::error::{AuditError, Result};
use crate::migration;
use crate::record::{AuditAction, AuditRecord, AuditRecordId};
use crate::traits::AuditStore;

const SELECT_COLUMNS: &str = "SELECT id, salt, user_id, action, resource_type, resource_id,
        metadata, ip_address, user_agent, created_at FROM audit_log";

/// SQLite-based audit store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AuditError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| AuditError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to convert a row to AuditRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let id_bytes: Vec<u8> = row.get("id")?;
    let salt_bytes: Vec<u8> = row.get("salt")?;
    let metadata_json: String = row.get("metadata")?;

    let id: [u8; 32] = id_bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, "id".into(), Type::Blob))?;
    let salt: [u8; 16] = salt_bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(1, "salt".into(), Type::Blob))?;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(AuditRecord::from_parts(
        AuditRecordId::from_bytes(id),
        salt,
        row.get::<_, Option<String>>("user_id")?.map(PrincipalId::from),
        AuditAction::new(row.get::<_, String>("action")?),
        row.get("resource_type")?,
        row.get("resource_id")?,
        metadata,
        row.get("ip_address")?,
        row.get("user_agent")?,
        row.get("created_at")?,
    ))
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        record.check_id()?;
        let record = record.clone();
        let metadata = serde_json::to_string(record.metadata())?;

        self.blocking(move |conn| {
            let existing: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT id FROM audit_log WHERE id = ?1",
                    params![record.id().as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Err(AuditError::Duplicate(record.id()));
            }

            conn.execute(
                "INSERT INTO audit_log (
                    id, salt, user_id, action, resource_type, resource_id,
                    metadata, ip_address, user_agent, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id().as_bytes().as_slice(),
                    record.salt().as_slice(),
                    record.user_id().map(PrincipalId::as_str),
                    record.action().as_str(),
                    record.resource_type(),
                    record.resource_id(),
                    metadata,
                    record.ip_address(),
                    record.user_agent(),
                    record.created_at(),
                ],
            )?;

            Ok(())
        })
        .await
    }

    async fn get(&self, id: &AuditRecordId) -> Result<Option<AuditRecord>> {
        let id = *id;

        self.blocking(move |conn| {
            let record = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    params![id.as_bytes().as_slice()],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        let resource_type = resource_type.to_string();
        let resource_id = resource_id.to_string();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE resource_type = ?1 AND resource_id = ?2 ORDER BY created_at, rowid",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![resource_type, resource_id], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn by_user(&self, user_id: &PrincipalId) -> Result<Vec<AuditRecord>> {
        let user_id = user_id.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE user_id = ?1 ORDER BY created_at, rowid",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![user_id.as_str()], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}
