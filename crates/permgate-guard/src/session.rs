//! Session resolution.
//!
//! The [`SessionResolver`] trait is the boundary to whatever identity
//! provider issued the session. The guard only ever sees its output: a
//! [`Principal`] or nothing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use permgate_core::{Principal, PrincipalId};

use crate::context::RequestContext;
use crate::error::SessionError;

/// Cookie carrying the session token when no bearer token is sent.
pub const DEFAULT_SESSION_COOKIE: &str = "next-auth.session-token";

/// Resolves the authenticated principal for a request.
///
/// Returns `None` when there is no valid session. Implementations never
/// fail: backend errors are logged and treated as "no session". Each call
/// reflects the current state of the backend, so a revoked or suspended
/// session stops resolving on the next request.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Principal>;
}

#[async_trait]
impl<R: SessionResolver + ?Sized> SessionResolver for Arc<R> {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
        (**self).resolve(ctx).await
    }
}

/// Account status of the session's subject.
///
/// Only `Active` accounts resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub principal: Principal,
    pub status: AccountStatus,
    /// Expiry, Unix milliseconds.
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn is_usable(&self, now: i64) -> bool {
        self.status == AccountStatus::Active && now < self.expires_at
    }
}

/// Backend holding sessions keyed by token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError>;
}

/// Resolver reading a bearer token or session cookie and checking it
/// against a [`SessionStore`].
pub struct TokenSessionResolver<S: SessionStore> {
    store: S,
    cookie_name: String,
}

impl<S: SessionStore> TokenSessionResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn token<'a>(&self, ctx: &'a RequestContext) -> Option<&'a str> {
        ctx.bearer_token()
            .or_else(|| ctx.cookie(&self.cookie_name).filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl<S: SessionStore> SessionResolver for TokenSessionResolver<S> {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
        let token = self.token(ctx)?;

        let record = match self.store.load(token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("unknown session token");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                return None;
            }
        };

        if !record.is_usable(now_millis()) {
            tracing::debug!(
                principal = %record.principal.id,
                status = ?record.status,
                "session not usable"
            );
            return None;
        }

        Some(record.principal)
    }
}

struct SessionMap {
    sessions: HashMap<String, SessionRecord>,
}

/// In-memory session store.
///
/// Useful for tests and single-process deployments.
pub struct MemorySessionStore {
    inner: RwLock<SessionMap>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionMap {
                sessions: HashMap::new(),
            }),
        }
    }

    /// Issue a fresh random token for `principal`, valid for `ttl_ms`.
    pub fn issue(&self, principal: Principal, ttl_ms: i64) -> Result<String, SessionError> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.insert(
            token.clone(),
            SessionRecord {
                principal,
                status: AccountStatus::Active,
                expires_at: now_millis().saturating_add(ttl_ms),
            },
        )?;
        Ok(token)
    }

    /// Store a session under a caller-chosen token.
    pub fn insert(&self, token: impl Into<String>, record: SessionRecord) -> Result<(), SessionError> {
        let mut inner = self.write()?;
        inner.sessions.insert(token.into(), record);
        Ok(())
    }

    /// Drop a session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        let mut inner = self.write()?;
        Ok(inner.sessions.remove(token).is_some())
    }

    /// Change the account status on every session of `id`.
    pub fn set_status(&self, id: &PrincipalId, status: AccountStatus) -> Result<usize, SessionError> {
        let mut inner = self.write()?;
        let mut changed = 0;
        for record in inner.sessions.values_mut() {
            if &record.principal.id == id {
                record.status = status;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionMap>, SessionError> {
        self.inner
            .write()
            .map_err(|e| SessionError::Backend(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| SessionError::Backend(format!("lock poisoned: {}", e)))?;
        Ok(inner.sessions.get(token).cloned())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
