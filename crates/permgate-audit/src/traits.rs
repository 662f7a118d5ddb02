//! AuditStore trait: the abstract interface for audit persistence.
//!
//! There is deliberately no update or delete here. Records are independent
//! of each other; concurrent appends need no coordination beyond what the
//! backend does for itself.

use std::sync::Arc;

use async_trait::async_trait;
use permgate_core::PrincipalId;

use crate::error::Result;
use crate::record::{AuditRecord, AuditRecordId};

/// Async interface for audit record persistence.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a sealed record.
    ///
    /// Appending an id that is already stored fails with
    /// [`AuditError::Duplicate`](crate::AuditError::Duplicate); nothing is
    /// ever overwritten.
    async fn append(&self, record: &AuditRecord) -> Result<()>;

    /// Get a record by id.
    async fn get(&self, id: &AuditRecordId) -> Result<Option<AuditRecord>>;

    /// The most recent records, newest first, at most `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>>;

    /// All records about one resource, oldest first.
    async fn for_resource(&self, resource_type: &str, resource_id: &str)
        -> Result<Vec<AuditRecord>>;

    /// All records written on behalf of one principal, oldest first.
    async fn by_user(&self, user_id: &PrincipalId) -> Result<Vec<AuditRecord>>;

    /// Total number of records.
    async fn count(&self) -> Result<u64>;
}

#[async_trait]
impl<S: AuditStore + ?Sized> AuditStore for Arc<S> {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        (**self).append(record).await
    }

    async fn get(&self, id: &AuditRecordId) -> Result<Option<AuditRecord>> {
        (**self).get(id).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        (**self).recent(limit).await
    }

    async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        (**self).for_resource(resource_type, resource_id).await
    }

    async fn by_user(&self, user_id: &PrincipalId) -> Result<Vec<AuditRecord>> {
        (**self).by_user(user_id).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }
}
