//! # Permgate Guard
//!
//! Server-side authentication and authorization gate.
//!
//! ## Overview
//!
//! Every protected handler goes through a [`RequestGuard`] before touching
//! domain state:
//!
//! ```text
//! RequestContext ──> SessionResolver ──> Principal ──> matcher ──> Ok(Principal)
//!                          │                              │
//!                          └── None: Rejection::Unauthenticated (401)
//!                                                         └── no match: Rejection::Forbidden (403)
//! ```
//!
//! Rejections are returned as values, so a handler written with `?` cannot
//! fall through into its mutation.
//!
//! ## Key Types
//!
//! - [`SessionResolver`] - Resolves the principal for a request (identity provider boundary)
//! - [`TokenSessionResolver`] - Bearer-token / cookie resolver over a [`SessionStore`]
//! - [`Guard`] / [`RequestGuard`] - The `require_*` entry points
//! - [`Rejection`] - Terminal 401/403 outcome
//! - [`RequestMetadata`] - Client IP and user agent for audit records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use permgate_guard::{Guard, RequestContext, Rejection, TokenSessionResolver, MemorySessionStore};
//!
//! async fn delete_user(guard: &Guard<TokenSessionResolver<MemorySessionStore>>, ctx: RequestContext)
//!     -> Result<(), Rejection>
//! {
//!     let request = guard.request(ctx);
//!     let principal = request.require_permission(["user:delete:all"]).await?;
//!     // ... perform the deletion as `principal` ...
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod guard;
pub mod metadata;
pub mod session;

pub use context::RequestContext;
pub use error::{ErrorBody, ErrorResponse, Rejection, SessionError};
pub use guard::{Access, AccessVia, Guard, RequestGuard};
pub use metadata::RequestMetadata;
pub use session::{
    AccountStatus, MemorySessionStore, SessionRecord, SessionResolver, SessionStore,
    TokenSessionResolver, DEFAULT_SESSION_COOKIE,
};
