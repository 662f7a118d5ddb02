//! The authorization guard.
//!
//! A [`Guard`] is shared across the whole service. For each incoming request
//! it hands out a [`RequestGuard`], which resolves the session at most once
//! and answers every `require_*` check against that one principal.

use std::sync::Arc;

use tokio::sync::OnceCell;

use permgate_core::{Principal, PrincipalId, SUPERADMIN_ROLE};

use crate::context::RequestContext;
use crate::error::Rejection;
use crate::metadata::RequestMetadata;
use crate::session::SessionResolver;

/// Shared entry point for request authorization.
pub struct Guard<R: SessionResolver> {
    resolver: Arc<R>,
    superadmin_role: Arc<str>,
}

impl<R: SessionResolver> Clone for Guard<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            superadmin_role: Arc::clone(&self.superadmin_role),
        }
    }
}

impl<R: SessionResolver> Guard<R> {
    pub fn new(resolver: R) -> Self {
        Self::from_arc(Arc::new(resolver))
    }

    pub fn from_arc(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            superadmin_role: Arc::from(SUPERADMIN_ROLE),
        }
    }

    /// Use `role` instead of the built-in superadmin role name.
    pub fn with_superadmin_role(mut self, role: impl Into<String>) -> Self {
        self.superadmin_role = Arc::from(role.into());
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn superadmin_role(&self) -> &str {
        &self.superadmin_role
    }

    /// Begin authorizing one request.
    pub fn request(&self, ctx: RequestContext) -> RequestGuard<R> {
        RequestGuard {
            resolver: Arc::clone(&self.resolver),
            superadmin_role: Arc::clone(&self.superadmin_role),
            ctx,
            principal: OnceCell::new(),
        }
    }
}

/// How an ownership-or-permission check was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessVia {
    /// The principal holds the blanket permission.
    Permission,
    /// The principal owns the resource.
    Owner,
}

/// A granted ownership-or-permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub principal: Principal,
    pub via: AccessVia,
}

/// Per-request authorization state.
///
/// Dropping a pending check before the session resolves leaves nothing
/// cached; the next check resolves again.
pub struct RequestGuard<R: SessionResolver> {
    resolver: Arc<R>,
    superadmin_role: Arc<str>,
    ctx: RequestContext,
    principal: OnceCell<Option<Principal>>,
}

impl<R: SessionResolver> RequestGuard<R> {
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn metadata(&self) -> RequestMetadata {
        RequestMetadata::from_context(&self.ctx)
    }

    /// The resolved principal, or `None` when unauthenticated.
    pub async fn principal(&self) -> Option<&Principal> {
        self.principal
            .get_or_init(|| async { self.resolver.resolve(&self.ctx).await })
            .await
            .as_ref()
    }

    async fn authenticated(&self) -> Result<&Principal, Rejection> {
        match self.principal().await {
            Some(principal) => Ok(principal),
            None => {
                tracing::debug!("request rejected: no session");
                Err(Rejection::Unauthenticated)
            }
        }
    }

    /// Require any valid session.
    pub async fn require_authenticated(&self) -> Result<Principal, Rejection> {
        self.authenticated().await.cloned()
    }

    /// Require at least one of `required`.
    ///
    /// An empty list is never satisfied.
    pub async fn require_permission<Q>(&self, required: Q) -> Result<Principal, Rejection>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let required = collect(required);
        let principal = self.authenticated().await?;

        if principal.can_any(&required) {
            tracing::debug!(principal = %principal.id, required = ?required, "permission granted");
            Ok(principal.clone())
        } else {
            tracing::warn!(principal = %principal.id, required = ?required, "permission denied");
            Err(Rejection::missing_permission(&required))
        }
    }

    /// Ask whether the principal holds one of `required`, without rejecting.
    ///
    /// Only an absent session is an error. Use this when lacking the
    /// permission changes behavior instead of ending the request.
    pub async fn check_permission<Q>(&self, required: Q) -> Result<bool, Rejection>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let required = collect(required);
        let principal = self.authenticated().await?;
        Ok(principal.can_any(&required))
    }

    /// Require at least one of `roles`.
    pub async fn require_role<Q>(&self, roles: Q) -> Result<Principal, Rejection>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let roles = collect(roles);
        let principal = self.authenticated().await?;

        if principal.has_any_role(&roles) {
            Ok(principal.clone())
        } else {
            tracing::warn!(principal = %principal.id, roles = ?roles, "role denied");
            Err(Rejection::forbidden(format!(
                "Required role: {}",
                roles.join(" or ")
            )))
        }
    }

    /// Require the guard's superadmin role.
    pub async fn require_superadmin(&self) -> Result<Principal, Rejection> {
        let principal = self.authenticated().await?;

        if principal.has_role(&self.superadmin_role) {
            Ok(principal.clone())
        } else {
            tracing::warn!(principal = %principal.id, role = %self.superadmin_role, "superadmin required");
            Err(Rejection::forbidden(format!(
                "Required role: {}",
                self.superadmin_role
            )))
        }
    }

    /// Allow the owner of a resource, or anyone holding one of `blanket`.
    pub async fn require_owner_or_permission<Q>(
        &self,
        owner: &PrincipalId,
        blanket: Q,
    ) -> Result<Access, Rejection>
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let blanket = collect(blanket);
        let principal = self.authenticated().await?;

        let via = if principal.can_any(&blanket) {
            AccessVia::Permission
        } else if principal.owns(owner) {
            AccessVia::Owner
        } else {
            tracing::warn!(
                principal = %principal.id,
                owner = %owner,
                blanket = ?blanket,
                "not owner and no blanket permission"
            );
            return Err(Rejection::forbidden(format!(
                "Required ownership or permission: {}",
                blanket.join(" or ")
            )));
        };

        tracing::debug!(principal = %principal.id, via = ?via, "access granted");
        Ok(Access {
            principal: principal.clone(),
            via,
        })
    }
}

fn collect<Q>(items: Q) -> Vec<String>
where
    Q: IntoIterator,
    Q::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Resolves a fixed principal keyed by the `x-user` header and counts calls.
    struct HeaderResolver {
        principals: Vec<Principal>,
        calls: AtomicUsize,
    }

    impl HeaderResolver {
        fn new(principals: Vec<Principal>) -> Self {
            Self {
                principals,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SessionResolver for HeaderResolver {
        async fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = ctx.header("x-user")?;
            self.principals.iter().find(|p| p.id == *id).cloned()
        }
    }

    fn guard() -> Guard<HeaderResolver> {
        Guard::new(HeaderResolver::new(vec![
            Principal::new("root")
                .with_roles(["superadmin"])
                .with_permissions(["*"]),
            Principal::new("alice")
                .with_roles(["standard_user"])
                .with_permissions(["apikey:delete:own", "x:y:own"]),
            Principal::new("ops")
                .with_roles(["admin"])
                .with_permissions(["apikey:delete:all", "audit:read:all"]),
        ]))
    }

    fn as_user(guard: &Guard<HeaderResolver>, id: &str) -> RequestGuard<HeaderResolver> {
        guard.request(RequestContext::new().with_header("x-user", id))
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let guard = guard();
        let request = guard.request(RequestContext::new());

        assert_eq!(
            request.require_authenticated().await,
            Err(Rejection::Unauthenticated)
        );
        assert_eq!(
            request.require_permission(["x:y:z"]).await,
            Err(Rejection::Unauthenticated)
        );
        assert_eq!(
            request.check_permission(["x:y:z"]).await,
            Err(Rejection::Unauthenticated)
        );
        assert_eq!(request.require_superadmin().await, Err(Rejection::Unauthenticated));
    }

    #[tokio::test]
    async fn test_require_permission() {
        let guard = guard();

        let alice = as_user(&guard, "alice");
        let principal = alice.require_permission(["apikey:delete:own"]).await.unwrap();
        assert_eq!(principal.id, PrincipalId::from("alice"));

        let denied = alice.require_permission(["x:y:z"]).await.unwrap_err();
        assert_eq!(denied, Rejection::forbidden("Required permission: x:y:z"));
        assert_eq!(denied.status_code(), 403);

        let root = as_user(&guard, "root");
        assert!(root.require_permission(["anything:at:all"]).await.is_ok());
    }

    #[tokio::test]
    async fn test_require_permission_any_of() {
        let guard = guard();
        let alice = as_user(&guard, "alice");
        assert!(alice
            .require_permission(["apikey:delete:all", "apikey:delete:own"])
            .await
            .is_ok());

        let empty: [&str; 0] = [];
        assert!(alice.require_permission(empty).await.unwrap_err().is_forbidden());
    }

    #[tokio::test]
    async fn test_check_permission_is_a_probe() {
        let guard = guard();
        let alice = as_user(&guard, "alice");
        assert_eq!(alice.check_permission(["apikey:delete:all"]).await, Ok(false));
        assert_eq!(alice.check_permission(["apikey:delete:own"]).await, Ok(true));
    }

    #[tokio::test]
    async fn test_require_role_and_superadmin() {
        let guard = guard();

        let ops = as_user(&guard, "ops");
        assert!(ops.require_role(["admin", "superadmin"]).await.is_ok());
        assert_eq!(
            ops.require_superadmin().await,
            Err(Rejection::forbidden("Required role: superadmin"))
        );

        let alice = as_user(&guard, "alice");
        assert_eq!(
            alice.require_role(["admin"]).await,
            Err(Rejection::forbidden("Required role: admin"))
        );

        assert!(as_user(&guard, "root").require_superadmin().await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_or_permission() {
        let guard = guard();
        let owner: PrincipalId = "alice".into();

        let access = as_user(&guard, "alice")
            .require_owner_or_permission(&owner, ["apikey:delete:all"])
            .await
            .unwrap();
        assert_eq!(access.via, AccessVia::Owner);

        let access = as_user(&guard, "ops")
            .require_owner_or_permission(&owner, ["apikey:delete:all"])
            .await
            .unwrap();
        assert_eq!(access.via, AccessVia::Permission);
        assert_eq!(access.principal.id, PrincipalId::from("ops"));

        let denied = as_user(&guard, "alice")
            .require_owner_or_permission(&"bob".into(), ["apikey:delete:all"])
            .await
            .unwrap_err();
        assert!(denied.is_forbidden());
    }

    #[tokio::test]
    async fn test_session_resolved_once_per_request() {
        let guard = guard();
        let alice = as_user(&guard, "alice");

        alice.require_authenticated().await.unwrap();
        alice.check_permission(["x:y:own"]).await.unwrap();
        alice.require_permission(["apikey:delete:own"]).await.unwrap();
        assert_eq!(guard.resolver().calls.load(Ordering::SeqCst), 1);

        // A new request resolves again.
        as_user(&guard, "alice").require_authenticated().await.unwrap();
        assert_eq!(guard.resolver().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_configured_superadmin_role() {
        let guard = Guard::new(HeaderResolver::new(vec![
            Principal::new("owner").with_roles(["owner"]),
            Principal::new("root").with_roles(["superadmin"]),
        ]))
        .with_superadmin_role("owner");
        assert_eq!(guard.superadmin_role(), "owner");

        assert!(as_user(&guard, "owner").require_superadmin().await.is_ok());
        assert_eq!(
            as_user(&guard, "root").require_superadmin().await,
            Err(Rejection::forbidden("Required role: owner"))
        );

        // Clones share the setting.
        let cloned = guard.clone();
        assert!(as_user(&cloned, "owner").require_superadmin().await.is_ok());
    }

    /// Hangs on the first lookup, answers immediately afterwards.
    struct StallOnceResolver {
        stalled: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionResolver for StallOnceResolver {
        async fn resolve(&self, _ctx: &RequestContext) -> Option<Principal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Some(Principal::new("alice").with_permissions(["x:y:z"]))
        }
    }

    #[tokio::test]
    async fn test_cancelled_resolution_caches_nothing() {
        let guard = Guard::new(StallOnceResolver {
            stalled: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        });
        let request = guard.request(RequestContext::new());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), request.require_permission(["x:y:z"]))
                .await;
        assert!(timed_out.is_err());

        let principal = request.require_permission(["x:y:z"]).await.unwrap();
        assert_eq!(principal.id, PrincipalId::from("alice"));
        assert_eq!(guard.resolver().calls.load(Ordering::SeqCst), 2);

        // Now cached.
        request.require_authenticated().await.unwrap();
        assert_eq!(guard.resolver().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metadata() {
        let guard = guard();
        let request = guard.request(
            RequestContext::new()
                .with_header("x-real-ip", "192.0.2.10")
                .with_header("user-agent", "test-agent"),
        );
        let meta = request.metadata();
        assert_eq!(meta.ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
    }
}
