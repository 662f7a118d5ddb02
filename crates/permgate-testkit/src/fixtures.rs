//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use permgate_audit::{AuditError, AuditRecord, AuditRecordId, AuditStore, Result};
use permgate_core::{Principal, PrincipalId};
use permgate_guard::{RequestContext, SessionResolver};

/// Build a principal holding `permissions`.
pub fn principal(id: &str, permissions: &[&str]) -> Principal {
    Principal::new(id).with_permissions(permissions.iter().copied())
}

/// A request carrying `Authorization: Bearer <token>`.
pub fn bearer(token: &str) -> RequestContext {
    RequestContext::new().with_header("authorization", format!("Bearer {}", token))
}

/// Resolver backed by a fixed token table. Counts resolutions.
#[derive(Default)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, Principal>,
    resolutions: AtomicUsize,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.sessions.insert(token.into(), principal);
        self
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let token = ctx.bearer_token()?;
        self.sessions.get(token).cloned()
    }
}

/// Audit store whose writes always fail. Reads see an empty log.
#[derive(Default)]
pub struct FailingAuditStore {
    attempts: AtomicUsize,
}

impl FailingAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of append calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _record: &AuditRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::Unavailable("audit backend offline".into()))
    }

    async fn get(&self, _id: &AuditRecordId) -> Result<Option<AuditRecord>> {
        Ok(None)
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }

    async fn for_resource(&self, _resource_type: &str, _resource_id: &str) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }

    async fn by_user(&self, _user_id: &PrincipalId) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
}

/// An API key owned by a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub id: String,
    pub owner: PrincipalId,
    pub name: String,
}

/// In-memory API key table standing in for a domain store.
///
/// Counts successful deletions so tests can assert that a rejected request
/// never reached the mutation.
#[derive(Default)]
pub struct ApiKeyRegistry {
    keys: Mutex<HashMap<String, ApiKey>>,
    deletions: AtomicUsize,
}

impl ApiKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, owner: &str, name: &str) -> ApiKey {
        let key = ApiKey {
            id: id.to_string(),
            owner: PrincipalId::from(owner),
            name: name.to_string(),
        };
        self.lock().insert(key.id.clone(), key.clone());
        key
    }

    pub fn get(&self, id: &str) -> Option<ApiKey> {
        self.lock().get(id).cloned()
    }

    /// Remove a key. Returns it if it existed.
    pub fn delete(&self, id: &str) -> Option<ApiKey> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            self.deletions.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn deletions(&self) -> usize {
        self.deletions.load(Ordering::SeqCst)
    }

    // Fixture code: a poisoned lock means a test already panicked.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ApiKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
