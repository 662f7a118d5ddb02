//! Reading the audit trail back.

use permgate::audit::{AuditAction, AuditStore, MemoryAuditStore, SqliteAuditStore};
use permgate::{AuditEntry, AuthConfig, Authz, AuthzError, Mutation};
use permgate_testkit::{bearer, principal, StaticSessionResolver};

fn resolver() -> StaticSessionResolver {
    StaticSessionResolver::new()
        .with_session("auditor", principal("u-auditor", &["audit:read:all"]))
        .with_session("admin", principal("u-admin", &["user:*:all"]))
}

async fn update_user<S: AuditStore>(
    authz: &Authz<StaticSessionResolver, S>,
    user_id: &str,
) -> permgate::Result<()> {
    let user_id = user_id.to_string();
    authz
        .scope(
            bearer("admin")
                .with_header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .with_header("user-agent", "admin-console/2.1"),
        )
        .mutate(["user:write:all"], |_principal| async move {
            Ok::<_, AuthzError>(Mutation::new(
                (),
                AuditEntry::new(AuditAction::USER_UPDATED, "user")
                    .resource_id(user_id)
                    .meta("field", "name"),
            ))
        })
        .await
}

#[tokio::test]
async fn listing_requires_audit_read_permission() {
    let authz = Authz::new(resolver(), MemoryAuditStore::new(), AuthConfig::default()).unwrap();

    let err = authz.scope(bearer("admin")).audit_log(10).await.unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(
        err.to_response().body.message.as_deref(),
        Some("Required permission: audit:read:all")
    );

    let err = authz.scope(bearer("nobody")).audit_log(10).await.unwrap_err();
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn listing_is_newest_first_and_capped() {
    let config = AuthConfig {
        audit_listing_limit: 2,
        ..AuthConfig::default()
    };
    let authz = Authz::new(resolver(), MemoryAuditStore::new(), config).unwrap();

    for id in ["u-1", "u-2", "u-3"] {
        update_user(&authz, id).await.unwrap();
        // Distinct millisecond timestamps.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let records = authz.scope(bearer("auditor")).audit_log(1000).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].resource_id(), Some("u-3"));
    assert_eq!(records[1].resource_id(), Some("u-2"));

    let record = &records[0];
    assert_eq!(record.action(), &AuditAction::USER_UPDATED);
    assert_eq!(record.ip_address(), Some("203.0.113.9"));
    assert_eq!(record.user_agent(), Some("admin-console/2.1"));
    assert!(record.verify_id());
}

#[tokio::test]
async fn sqlite_trail_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.db");

    {
        let store = SqliteAuditStore::open(&path).unwrap();
        let authz = Authz::new(resolver(), store, AuthConfig::default()).unwrap();
        update_user(&authz, "u-42").await.unwrap();
    }

    let store = SqliteAuditStore::open(&path).unwrap();
    let authz = Authz::new(resolver(), store, AuthConfig::default()).unwrap();

    let records = authz.scope(bearer("auditor")).audit_log(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_id(), Some("u-42"));
    assert_eq!(records[0].metadata()["field"], "name");
    assert!(records[0].verify_id());
}
