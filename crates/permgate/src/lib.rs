//! # Permgate
//!
//! Permission-string authorization and an append-only audit trail for
//! request handlers.
//!
//! ## Overview
//!
//! - **Permissions**: `resource:action:scope` strings with `*` wildcards,
//!   flattened onto the principal at session-build time
//! - **Guard**: `require_*` checks that return 401/403 rejections as values
//! - **Audit**: immutable, content-addressed records written after a
//!   mutation succeeds
//! - **Client gate**: advisory show/hide decisions sharing the same matcher
//!
//! ## Usage
//!
//! ```rust,no_run
//! use permgate::{AuditEntry, AuthConfig, Authz, Mutation, RequestContext};
//! use permgate::audit::{AuditAction, SqliteAuditStore};
//! use permgate::guard::MemorySessionStore;
//!
//! async fn example(ctx: RequestContext) -> permgate::Result<()> {
//!     let config = AuthConfig::default();
//!     let resolver = config.session_resolver(MemorySessionStore::new());
//!     let store = SqliteAuditStore::open("audit.db")?;
//!     let authz = Authz::new(resolver, store, config)?;
//!
//!     let scope = authz.scope(ctx);
//!     scope
//!         .mutate(["user:delete:all"], |_principal| async move {
//!             // ... delete the user ...
//!             Ok::<_, permgate::AuthzError>(Mutation::new(
//!                 (),
//!                 AuditEntry::new(AuditAction::USER_DELETED, "user").resource_id("u-42"),
//!             ))
//!         })
//!         .await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `permgate::core` - Permission matcher, principals, roles
//! - `permgate::audit` - Audit records, recorder and stores
//! - `permgate::guard` - Session resolution and the guard
//! - `permgate::client` - Client capability gate

pub mod authz;
pub mod config;
pub mod error;

pub use permgate_audit as audit;
pub use permgate_client as client;
pub use permgate_core as core;
pub use permgate_guard as guard;

pub use authz::{AuditEntry, Authz, Mutation, RequestScope};
pub use config::AuthConfig;
pub use error::{AuthzError, Result};

pub use permgate_core::{matches, matches_all, matches_any, Permission, Principal, PrincipalId};
pub use permgate_guard::{Access, AccessVia, Rejection, RequestContext, RequestMetadata};
