//! # Permgate Core
//!
//! Pure primitives for permgate: permission strings, the permission matcher,
//! principals, and roles.
//!
//! This crate contains no I/O, no storage, no async. Everything here is a
//! deterministic function of its inputs and is shared verbatim by the server
//! guard and the client capability gate.
//!
//! ## Key Types
//!
//! - [`Permission`] - A parsed `resource:action:scope` grant or the universal `*`
//! - [`Principal`] - The authenticated actor with flattened permissions
//! - [`Role`] / [`RoleCatalog`] - Named permission bundles resolved at login
//! - [`PrincipalId`] - Opaque identity id
//!
//! ## Matching
//!
//! ```rust
//! use permgate_core::{matches, matches_all, matches_any};
//!
//! let granted = ["apikey:*:all", "user:read:self"];
//!
//! assert!(matches(&granted, "apikey:delete:all"));
//! assert!(!matches(&granted, "apikey:delete:own"));
//! assert!(matches_any(&granted, ["user:write:all", "user:read:self"]));
//! assert!(!matches_all(&granted, ["user:write:all", "user:read:self"]));
//! ```

pub mod error;
pub mod matcher;
pub mod permission;
pub mod principal;
pub mod role;
pub mod types;

pub use error::{CoreError, PermissionError, Result};
pub use matcher::{matches, matches_all, matches_any};
pub use permission::{Permission, WILDCARD};
pub use principal::Principal;
pub use role::{has_any_role, has_role, is_superadmin, Role, RoleCatalog, SUPERADMIN_ROLE};
pub use types::PrincipalId;
