//! End-to-end API key deletion through the guard and the audit trail.
//!
//! The handler mirrors a real route: authenticate with one of the delete
//! permissions, look the key up, then allow the owner or a holder of the
//! blanket permission.

use permgate::audit::{AuditAction, AuditPolicy, AuditStore, MemoryAuditStore};
use permgate::{AccessVia, AuditEntry, AuthConfig, Authz, AuthzError, Mutation, PrincipalId};
use permgate::RequestContext;
use permgate_testkit::{
    bearer, principal, ApiKey, ApiKeyRegistry, FailingAuditStore, StaticSessionResolver,
};

fn resolver() -> StaticSessionResolver {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    StaticSessionResolver::new()
        .with_session("alice-token", principal("alice", &["apikey:delete:own"]))
        .with_session("bob-token", principal("bob", &["apikey:delete:own"]))
        .with_session("ops-token", principal("ops", &["apikey:delete:all"]))
        .with_session("viewer-token", principal("viewer", &["apikey:read:own"]))
}

fn registry() -> ApiKeyRegistry {
    let registry = ApiKeyRegistry::new();
    registry.insert("key-alice", "alice", "alice laptop");
    registry.insert("key-bob", "bob", "bob ci");
    registry
}

fn authz<S: AuditStore>(store: S, policy: AuditPolicy) -> Authz<StaticSessionResolver, S> {
    let config = AuthConfig {
        audit_policy: policy,
        ..AuthConfig::default()
    };
    Authz::new(resolver(), store, config).unwrap()
}

async fn delete_api_key<S: AuditStore>(
    authz: &Authz<StaticSessionResolver, S>,
    registry: &ApiKeyRegistry,
    ctx: RequestContext,
    key_id: &str,
) -> permgate::Result<AccessVia> {
    let scope = authz.scope(ctx);
    scope
        .require_permission(["apikey:delete:own", "apikey:delete:all"])
        .await?;

    let ApiKey { id, owner, name } = registry
        .get(key_id)
        .ok_or_else(|| AuthzError::NotFound("API key not found".into()))?;

    scope
        .mutate_owned(&owner, ["apikey:delete:all"], |access| async move {
            if registry.delete(&id).is_none() {
                return Err(AuthzError::NotFound("API key not found".into()));
            }

            Ok(Mutation::new(
                access.via,
                AuditEntry::new(AuditAction::APIKEY_DELETED, "apikey")
                    .resource_id(id)
                    .meta("name", name),
            ))
        })
        .await
}

#[tokio::test]
async fn owner_deletes_own_key() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let via = delete_api_key(&authz, &registry, bearer("alice-token"), "key-alice")
        .await
        .unwrap();
    assert_eq!(via, AccessVia::Owner);

    assert!(registry.get("key-alice").is_none());
    assert_eq!(registry.deletions(), 1);

    let store = authz.recorder().store();
    assert_eq!(store.count().await.unwrap(), 1);

    let records = store.for_resource("apikey", "key-alice").await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.action().as_str(), "apikey.deleted");
    assert_eq!(record.resource_id(), Some("key-alice"));
    assert_eq!(record.user_id(), Some(&PrincipalId::from("alice")));
    assert_eq!(record.metadata()["name"], "alice laptop");
    assert!(record.verify_id());
}

#[tokio::test]
async fn deleting_someone_elses_key_is_forbidden() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let err = delete_api_key(&authz, &registry, bearer("alice-token"), "key-bob")
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
    assert_eq!(err.status_code(), 403);
    assert_eq!(registry.deletions(), 0);
    assert!(registry.get("key-bob").is_some());
    assert_eq!(authz.recorder().store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn blanket_permission_deletes_any_key() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let via = delete_api_key(&authz, &registry, bearer("ops-token"), "key-bob")
        .await
        .unwrap();
    assert_eq!(via, AccessVia::Permission);

    let records = authz.recorder().store().by_user(&"ops".into()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_id(), Some("key-bob"));
}

#[tokio::test]
async fn unauthenticated_request_never_mutates() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    for ctx in [RequestContext::new(), bearer("stolen-token")] {
        let err = delete_api_key(&authz, &registry, ctx, "key-alice")
            .await
            .unwrap_err();
        assert!(err.is_unauthenticated());
        assert_eq!(err.status_code(), 401);
    }

    assert_eq!(registry.deletions(), 0);
    assert_eq!(registry.len(), 2);
    assert_eq!(authz.recorder().store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_delete_permission_is_forbidden_before_lookup() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let err = delete_api_key(&authz, &registry, bearer("viewer-token"), "does-not-exist")
        .await
        .unwrap_err();

    // Authorization is checked first, so a missing key is not revealed.
    assert!(err.is_forbidden());
    let body = err.to_response().body;
    assert_eq!(
        body.message.as_deref(),
        Some("Required permission: apikey:delete:own or apikey:delete:all")
    );
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let err = delete_api_key(&authz, &registry, bearer("alice-token"), "key-zzz")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(authz.recorder().store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn audit_failure_does_not_undo_or_fail_the_deletion() {
    let authz = authz(FailingAuditStore::new(), AuditPolicy::BestEffort);
    let registry = registry();

    let result = delete_api_key(&authz, &registry, bearer("alice-token"), "key-alice").await;

    assert!(result.is_ok());
    assert!(registry.get("key-alice").is_none());
    assert_eq!(registry.deletions(), 1);
    assert_eq!(authz.recorder().store().attempts(), 1);
}

#[tokio::test]
async fn required_audit_policy_reports_failure_without_rollback() {
    let authz = authz(FailingAuditStore::new(), AuditPolicy::Required);
    let registry = registry();

    let err = delete_api_key(&authz, &registry, bearer("alice-token"), "key-alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::Audit(_)));
    assert_eq!(err.status_code(), 500);
    // The deletion already happened and stays applied.
    assert!(registry.get("key-alice").is_none());
    assert_eq!(registry.deletions(), 1);
}

#[tokio::test]
async fn failed_operation_writes_no_record() {
    let authz = authz(MemoryAuditStore::new(), AuditPolicy::BestEffort);
    let scope = authz.scope(bearer("ops-token"));

    let result: permgate::Result<()> = scope
        .mutate(["apikey:delete:all"], |_principal| async {
            Err::<Mutation<()>, _>(AuthzError::Operation("database unavailable".into()))
        })
        .await;

    assert!(matches!(result, Err(AuthzError::Operation(_))));
    assert_eq!(authz.recorder().store().count().await.unwrap(), 0);
}
