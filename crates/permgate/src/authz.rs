//! Guarded request handling.
//!
//! [`Authz`] ties the guard and the audit recorder together so a handler
//! cannot get the order wrong: authorize, apply the mutation, then record
//! it. A rejected request never reaches the mutation, and a failed
//! mutation never reaches the audit trail.

use std::future::Future;

use serde_json::{Map, Value};

use permgate_audit::{
    AuditAction, AuditRecord, AuditRecordId, AuditRecordInput, AuditRecorder, AuditStore,
};
use permgate_core::{Principal, PrincipalId};
use permgate_guard::{
    Access, Guard, RequestContext, RequestGuard, RequestMetadata, SessionResolver,
};

use crate::config::AuthConfig;
use crate::error::{AuthzError, Result};

/// The handler-supplied part of an audit record.
///
/// Who performed the action and where the request came from are filled in
/// by the [`RequestScope`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            metadata: Map::new(),
        }
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn into_input(self, user: &PrincipalId, origin: RequestMetadata) -> AuditRecordInput {
        let mut input = AuditRecordInput::new(self.action, self.resource_type)
            .user(user.clone())
            .metadata(self.metadata)
            .origin(origin.ip_address, origin.user_agent);
        input.resource_id = self.resource_id;
        input
    }
}

/// Result of a guarded operation: its output plus what to record about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub output: T,
    pub audit: AuditEntry,
}

impl<T> Mutation<T> {
    pub fn new(output: T, audit: AuditEntry) -> Self {
        Self { output, audit }
    }
}

/// The authorization service.
pub struct Authz<R: SessionResolver, S: AuditStore> {
    guard: Guard<R>,
    recorder: AuditRecorder<S>,
    config: AuthConfig,
}

impl<R: SessionResolver, S: AuditStore> Authz<R, S> {
    /// Build the service, rejecting an invalid `config`.
    pub fn new(resolver: R, store: S, config: AuthConfig) -> Result<Self> {
        let recorder = AuditRecorder::new(store).with_policy(config.audit_policy);
        Self::from_parts(Guard::new(resolver), recorder, config)
    }

    /// Assemble from prebuilt parts. The guard takes the configured
    /// superadmin role; the recorder keeps its own policy.
    pub fn from_parts(
        guard: Guard<R>,
        recorder: AuditRecorder<S>,
        config: AuthConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            guard: guard.with_superadmin_role(config.superadmin_role.clone()),
            recorder,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn guard(&self) -> &Guard<R> {
        &self.guard
    }

    pub fn recorder(&self) -> &AuditRecorder<S> {
        &self.recorder
    }

    /// Open the scope for one request.
    pub fn scope(&self, ctx: RequestContext) -> RequestScope<'_, R, S> {
        RequestScope {
            authz: self,
            guard: self.guard.request(ctx),
        }
    }
}

/// Authorization and audit for a single request.
pub struct RequestScope<'a, R: SessionResolver, S: AuditStore> {
    authz: &'a Authz<R, S>,
    guard: RequestGuard<R>,
}

impl<'a, R: SessionResolver, S: AuditStore> RequestScope<'a, R, S> {
    pub fn metadata(&self) -> RequestMetadata {
        self.guard.metadata()
    }

    pub async fn require_authenticated(&self) -> Result<Principal> {
        Ok(self.guard.require_authenticated().await?)
    }

    pub async fn require_permission<Q>(&self, required: Q) -> Result<Principal>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Ok(self.guard.require_permission(required).await?)
    }

    /// Probe: `Ok(false)` when the principal lacks every one of `required`.
    pub async fn check_permission<Q>(&self, required: Q) -> Result<bool>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Ok(self.guard.check_permission(required).await?)
    }

    pub async fn require_role<Q>(&self, roles: Q) -> Result<Principal>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Ok(self.guard.require_role(roles).await?)
    }

    /// Require the configured superadmin role.
    pub async fn require_superadmin(&self) -> Result<Principal> {
        Ok(self.guard.require_superadmin().await?)
    }

    pub async fn require_owner_or_permission<Q>(
        &self,
        owner: &PrincipalId,
        blanket: Q,
    ) -> Result<Access>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        Ok(self.guard.require_owner_or_permission(owner, blanket).await?)
    }

    /// Record a completed action by `principal` under the configured policy.
    ///
    /// Call only after the action has been applied. Returns `Ok(None)` when
    /// a best-effort write was lost.
    pub async fn audit(
        &self,
        principal: &Principal,
        entry: AuditEntry,
    ) -> Result<Option<AuditRecordId>> {
        let input = entry.into_input(&principal.id, self.metadata());
        Ok(self.authz.recorder.commit(input).await?)
    }

    /// Authorize, run `op`, then record it.
    ///
    /// Nothing is recorded when authorization or `op` fails. An audit
    /// failure under the `required` policy is returned after `op` has
    /// already taken effect; it is never rolled back.
    pub async fn mutate<Q, F, Fut, T>(&self, required: Q, op: F) -> Result<T>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
        F: FnOnce(Principal) -> Fut,
        Fut: Future<Output = Result<Mutation<T>>>,
    {
        let principal = self.require_permission(required).await?;
        let Mutation { output, audit } = op(principal.clone())
            .await
            .map_err(|e| log_failed_operation(&principal.id, e))?;
        self.audit(&principal, audit).await?;
        Ok(output)
    }

    /// Like [`mutate`](Self::mutate), but the owner of the resource may
    /// proceed without the blanket permission.
    pub async fn mutate_owned<Q, F, Fut, T>(
        &self,
        owner: &PrincipalId,
        blanket: Q,
        op: F,
    ) -> Result<T>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
        F: FnOnce(Access) -> Fut,
        Fut: Future<Output = Result<Mutation<T>>>,
    {
        let access = self.require_owner_or_permission(owner, blanket).await?;
        let principal = access.principal.clone();
        let Mutation { output, audit } = op(access)
            .await
            .map_err(|e| log_failed_operation(&principal.id, e))?;
        self.audit(&principal, audit).await?;
        Ok(output)
    }

    /// Most recent audit records, newest first.
    ///
    /// Requires the configured audit read permission. `limit` is capped at
    /// the configured listing limit.
    pub async fn audit_log(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let config = &self.authz.config;
        self.require_permission([config.audit_read_permission.as_str()])
            .await?;

        let limit = limit.min(config.audit_listing_limit);
        let records = self.authz.recorder.store().recent(limit).await?;
        tracing::debug!(limit, returned = records.len(), "audit log listed");
        Ok(records)
    }
}

fn log_failed_operation(principal: &PrincipalId, error: AuthzError) -> AuthzError {
    tracing::debug!(principal = %principal, error = %error, "guarded operation failed, nothing recorded");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use permgate_audit::MemoryAuditStore;
    use permgate_guard::{MemorySessionStore, TokenSessionResolver};

    const HOUR: i64 = 60 * 60 * 1000;

    fn service() -> (Authz<TokenSessionResolver<MemorySessionStore>, MemoryAuditStore>, String) {
        let config = AuthConfig::default();
        let sessions = MemorySessionStore::new();
        let token = sessions
            .issue(
                Principal::new("editor").with_permissions(["academy:content:update:self_domain"]),
                HOUR,
            )
            .unwrap();
        let authz = Authz::new(
            config.session_resolver(sessions),
            MemoryAuditStore::new(),
            config,
        )
        .unwrap();
        (authz, token)
    }

    fn request(token: &str) -> RequestContext {
        RequestContext::new()
            .with_header("cookie", format!("next-auth.session-token={}", token))
            .with_header("x-forwarded-for", "198.51.100.20")
    }

    #[tokio::test]
    async fn test_audit_fills_user_and_origin() {
        let (authz, token) = service();
        let scope = authz.scope(request(&token));
        let principal = scope.require_authenticated().await.unwrap();

        let id = scope
            .audit(
                &principal,
                AuditEntry::new(AuditAction::ACADEMY_CONTENT_UPDATED, "academy_content")
                    .resource_id("c-1")
                    .meta("title", "Intro"),
            )
            .await
            .unwrap()
            .unwrap();

        let record = authz.recorder().store().get(&id).await.unwrap().unwrap();
        assert_eq!(record.user_id(), Some(&PrincipalId::from("editor")));
        assert_eq!(record.resource_id(), Some("c-1"));
        assert_eq!(record.ip_address(), Some("198.51.100.20"));
        assert_eq!(record.user_agent(), None);
        assert_eq!(record.metadata()["title"], "Intro");
    }

    #[tokio::test]
    async fn test_mutate_matches_four_part_grant_verbatim() {
        let (authz, token) = service();
        let scope = authz.scope(request(&token));

        let out = scope
            .mutate(["academy:content:update:self_domain"], |_principal| async {
                Ok::<_, crate::AuthzError>(Mutation::new(
                    7,
                    AuditEntry::new(AuditAction::ACADEMY_CONTENT_UPDATED, "academy_content"),
                ))
            })
            .await
            .unwrap();
        assert_eq!(out, 7);
        assert_eq!(authz.recorder().store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_superadmin_uses_configured_role() {
        let sessions = MemorySessionStore::new();
        let token = sessions
            .issue(Principal::new("root").with_roles(["owner"]), HOUR)
            .unwrap();
        let config = AuthConfig {
            superadmin_role: "owner".into(),
            ..AuthConfig::default()
        };
        let authz = Authz::new(
            config.session_resolver(sessions),
            MemoryAuditStore::new(),
            config,
        )
        .unwrap();
        assert_eq!(authz.guard().superadmin_role(), "owner");

        let scope = authz.scope(request(&token));
        assert!(scope.require_superadmin().await.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AuthConfig {
            audit_listing_limit: 0,
            ..AuthConfig::default()
        };
        let result = Authz::new(
            config.session_resolver(MemorySessionStore::new()),
            MemoryAuditStore::new(),
            config,
        );
        assert!(matches!(result, Err(AuthzError::Config(_))));
    }
}
