//! In-memory implementation of the AuditStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use permgate_core::PrincipalId;

use crate::error::{AuditError, Result};
use crate::record::{AuditRecord, AuditRecordId};
use crate::traits::AuditStore;

/// In-memory audit store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryAuditStore {
    inner: RwLock<MemoryAuditInner>,
}

#[derive(Default)]
struct MemoryAuditInner {
    /// Records in append order.
    records: Vec<AuditRecord>,

    /// Ids already appended.
    ids: HashSet<AuditRecordId>,
}

impl MemoryAuditStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryAuditInner>> {
        self.inner
            .read()
            .map_err(|e| AuditError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryAuditInner>> {
        self.inner
            .write()
            .map_err(|e| AuditError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        record.check_id()?;
        let mut inner = self.write()?;
        if !inner.ids.insert(record.id()) {
            return Err(AuditError::Duplicate(record.id()));
        }
        inner.records.push(record.clone());
        Ok(())
    }

    async fn get(&self, id: &AuditRecordId) -> Result<Option<AuditRecord>> {
        let inner = self.read()?;
        Ok(inner.records.iter().find(|r| &r.id() == id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let inner = self.read()?;
        // Reverse first so equal timestamps keep newest-appended first.
        let mut records: Vec<AuditRecord> = inner.records.iter().rev().cloned().collect();
        records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        records.truncate(limit);
        Ok(records)
    }

    async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.resource_type() == resource_type && r.resource_id() == Some(resource_id))
            .cloned()
            .collect())
    }

    async fn by_user(&self, user_id: &PrincipalId) -> Result<Vec<AuditRecord>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.user_id() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AuditAction, AuditRecordInput};

    fn record(resource_id: &str, created_at: i64) -> AuditRecord {
        let input = AuditRecordInput::new(AuditAction::APIKEY_DELETED, "apikey")
            .user("user-1")
            .resource_id(resource_id);
        AuditRecord::seal(input, created_at).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = MemoryAuditStore::new();
        let r = record("k1", 1000);

        store.append(&r).await.unwrap();

        assert_eq!(store.get(&r.id()).await.unwrap(), Some(r));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_only() {
        let store = MemoryAuditStore::new();
        let r = record("k1", 1000);

        store.append(&r).await.unwrap();
        let second = store.append(&r).await;

        assert!(matches!(second, Err(AuditError::Duplicate(id)) if id == r.id()));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_record_with_stale_id() {
        let store = MemoryAuditStore::new();
        let r = record("k1", 1000);

        let mut json = serde_json::to_value(&r).unwrap();
        json["resourceId"] = serde_json::json!("k2");
        let tampered: AuditRecord = serde_json::from_value(json).unwrap();

        let result = store.append(&tampered).await;
        assert!(matches!(result, Err(AuditError::InvalidRecord(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_newest_first_with_limit() {
        let store = MemoryAuditStore::new();
        store.append(&record("k1", 1000)).await.unwrap();
        store.append(&record("k2", 3000)).await.unwrap();
        store.append(&record("k3", 2000)).await.unwrap();
        store.append(&record("k4", 3000)).await.unwrap();

        let recent = store.recent(3).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.resource_id().unwrap()).collect();
        assert_eq!(ids, vec!["k4", "k2", "k3"]);
    }

    #[tokio::test]
    async fn test_queries() {
        let store = MemoryAuditStore::new();
        store.append(&record("k1", 1000)).await.unwrap();
        store.append(&record("k2", 2000)).await.unwrap();
        store.append(&record("k1", 3000)).await.unwrap();

        assert_eq!(store.for_resource("apikey", "k1").await.unwrap().len(), 2);
        assert_eq!(store.for_resource("user", "k1").await.unwrap().len(), 0);
        assert_eq!(store.by_user(&"user-1".into()).await.unwrap().len(), 3);
        assert_eq!(store.by_user(&"user-2".into()).await.unwrap().len(), 0);
    }
}
