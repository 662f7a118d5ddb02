//! # Permgate Testkit
//!
//! Testing utilities for permgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: matcher cases with expected outcomes, checked against
//!   both the server matcher and the client gate
//! - **Generators**: Proptest strategies for permission strings
//! - **Fixtures**: Session resolvers, a failing audit store, and an API key
//!   registry that counts mutations
//!
//! ## Golden Vectors
//!
//! ```rust
//! use permgate_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "vector failed: {}", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use permgate_testkit::generators::{grant, permission};
//!
//! proptest! {
//!     #[test]
//!     fn universal_grant_matches(required in permission()) {
//!         prop_assert!(permgate_core::matches(["*"], &required));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use permgate_testkit::fixtures::{bearer, principal, StaticSessionResolver};
//!
//! let resolver = StaticSessionResolver::new()
//!     .with_session("alice-token", principal("alice", &["apikey:delete:own"]));
//! let ctx = bearer("alice-token");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    bearer, principal, ApiKey, ApiKeyRegistry, FailingAuditStore, StaticSessionResolver,
};
pub use generators::{grant, malformed, permission};
pub use vectors::{all_vectors, verify_all_vectors, MatchMode, MatcherVector};
