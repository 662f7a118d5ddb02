//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{AuditError, Result};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::recorder::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated audit schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(AuditError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: audit log table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE audit_log (
            id BLOB PRIMARY KEY,              -- 32 bytes, BLAKE3 of canonical content
            salt BLOB NOT NULL,               -- 16 random bytes mixed into the id
            user_id TEXT,                     -- acting principal, nullable
            action TEXT NOT NULL,             -- dot-namespaced action tag
            resource_type TEXT NOT NULL,
            resource_id TEXT,
            metadata TEXT NOT NULL,           -- JSON object
            ip_address TEXT,
            user_agent TEXT,
            created_at INTEGER NOT NULL       -- Unix ms
        );

        CREATE INDEX idx_audit_created ON audit_log(created_at);
        CREATE INDEX idx_audit_resource ON audit_log(resource_type, resource_id);
        CREATE INDEX idx_audit_user ON audit_log(user_id);
        CREATE INDEX idx_audit_action ON audit_log(action);
        "#,
    )?;

    Ok(())
}

/// Migration v2: reject UPDATE and DELETE on the audit log.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TRIGGER audit_log_no_update BEFORE UPDATE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log is append-only');
        END;

        CREATE TRIGGER audit_log_no_delete BEFORE DELETE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log is append-only');
        END;
        "#,
    )?;

    Ok(())
}
