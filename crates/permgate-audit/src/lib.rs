//! # Permgate Audit
//!
//! Append-only audit trail for security-relevant actions.
//!
//! ## Overview
//!
//! After a guarded mutation has been durably applied, the handler that
//! performed it hands an [`AuditRecordInput`] to the [`AuditRecorder`]. The
//! recorder seals it into an immutable [`AuditRecord`] and appends it to an
//! [`AuditStore`].
//!
//! ## Key Types
//!
//! - [`AuditStore`] - The async trait for audit persistence (append and read, never update)
//! - [`SqliteAuditStore`] - SQLite-based persistent storage
//! - [`MemoryAuditStore`] - In-memory storage for tests
//! - [`AuditRecorder`] - Seals and appends records under an [`AuditPolicy`]
//! - [`AuditAction`] - The stable dot-namespaced action taxonomy
//!
//! ## Usage
//!
//! ```rust,no_run
//! use permgate_audit::{AuditAction, AuditRecordInput, AuditRecorder, SqliteAuditStore};
//!
//! async fn example() {
//!     let store = SqliteAuditStore::open("audit.db").unwrap();
//!     let recorder = AuditRecorder::new(store);
//!
//!     let input = AuditRecordInput::new(AuditAction::APIKEY_DELETED, "apikey")
//!         .user("user-1")
//!         .resource_id("key-42")
//!         .meta("provider", "openai");
//!
//!     // Never fails the caller: write failures are logged.
//!     let _id = recorder.record_best_effort(input).await;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: the store trait has no update or delete, and the SQLite
//!   schema rejects both with triggers.
//! - **Best-effort by default**: an audit write failure is logged and never
//!   rolls back or fails the mutation that triggered it.
//! - **Content-addressed ids**: a record id is the BLAKE3 digest of its
//!   canonical encoding, so tampering is detectable with
//!   [`AuditRecord::verify_id`].

pub mod error;
pub mod memory;
pub mod migration;
pub mod record;
pub mod recorder;
pub mod sqlite;
pub mod traits;

pub use error::{AuditError, Result};
pub use memory::MemoryAuditStore;
pub use record::{AuditAction, AuditRecord, AuditRecordId, AuditRecordInput};
pub use recorder::{AuditPolicy, AuditRecorder};
pub use sqlite::SqliteAuditStore;
pub use traits::AuditStore;
