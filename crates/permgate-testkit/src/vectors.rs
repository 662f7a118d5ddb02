//! Golden matcher vectors.
//!
//! The same table is checked against the server matcher and the client
//! capability gate so the two tiers cannot drift apart.

use serde::Serialize;

use permgate_client::{permission_status, CapabilityGate, ClientSession, SessionView, Visibility};
use permgate_core::{matches_all, matches_any, Principal};

/// How `required` is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Any,
    All,
}

/// A golden matcher vector.
#[derive(Debug, Clone, Serialize)]
pub struct MatcherVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub granted: &'static [&'static str],
    pub required: &'static [&'static str],
    pub mode: MatchMode,
    pub expected: bool,
}

const fn any(
    name: &'static str,
    granted: &'static [&'static str],
    required: &'static [&'static str],
    expected: bool,
) -> MatcherVector {
    MatcherVector {
        name,
        granted,
        required,
        mode: MatchMode::Any,
        expected,
    }
}

const fn all(
    name: &'static str,
    granted: &'static [&'static str],
    required: &'static [&'static str],
    expected: bool,
) -> MatcherVector {
    MatcherVector {
        name,
        granted,
        required,
        mode: MatchMode::All,
        expected,
    }
}

/// Get all golden matcher vectors.
pub fn all_vectors() -> Vec<MatcherVector> {
    vec![
        any("universal grant", &["*"], &["anything:at:all"], true),
        any("universal grant covers malformed", &["*"], &["legacy"], true),
        any("exact match", &["apikey:delete:own"], &["apikey:delete:own"], true),
        any("scope mismatch", &["apikey:delete:all"], &["apikey:delete:own"], false),
        any("action wildcard", &["apikey:*:all"], &["apikey:delete:all"], true),
        any("resource and scope wildcard", &["*:delete:*"], &["user:delete:own"], true),
        any("wildcard in required is literal", &["apikey:delete:own"], &["apikey:*:own"], false),
        any("required star needs full wildcard", &["*:*:*"], &["*"], true),
        any("partial wildcard does not satisfy star", &["apikey:*:*"], &["*"], false),
        any(
            "four-part permission verbatim",
            &["academy:content:create:self_domain"],
            &["academy:content:create:self_domain"],
            true,
        ),
        any(
            "four-part permission not wildcarded",
            &["academy:*:create"],
            &["academy:content:create:self_domain"],
            false,
        ),
        any("malformed grant verbatim", &["n8n:workflow:read:team"], &["n8n:workflow:read:team"], true),
        any("malformed grant does not wildcard", &["n8n:*"], &["n8n:workflow:read"], false),
        any("case sensitive", &["User:read:all"], &["user:read:all"], false),
        any(
            "any of two",
            &["user:write:non_admin"],
            &["user:write:all", "user:write:non_admin"],
            true,
        ),
        any("any of empty", &["*"], &[], false),
        any("nothing granted", &[], &["user:read:own"], false),
        all("all of empty", &[], &[], true),
        all(
            "all with one missing",
            &["user:read:all"],
            &["user:read:all", "user:write:all"],
            false,
        ),
        all(
            "all covered by wildcards",
            &["user:*:all", "audit:read:*"],
            &["user:read:all", "user:write:all", "audit:read:all"],
            true,
        ),
    ]
}

/// Server-side outcome for a vector.
pub fn server_outcome(vector: &MatcherVector) -> bool {
    match vector.mode {
        MatchMode::Any => matches_any(vector.granted, vector.required),
        MatchMode::All => matches_all(vector.granted, vector.required),
    }
}

/// Client-side outcome for a vector, via the capability gate.
pub fn client_outcome(vector: &MatcherVector) -> bool {
    let principal = Principal::new("vector").with_permissions(vector.granted.iter().copied());
    let view = SessionView::Authenticated(ClientSession::from(principal));

    match vector.mode {
        MatchMode::Any => {
            CapabilityGate::new()
                .permission(vector.required)
                .evaluate(&view)
                == Visibility::Show
        }
        MatchMode::All => vector
            .required
            .iter()
            .all(|required| permission_status(&view, [required]).granted),
    }
}

/// Check every vector on both tiers. Returns `(name, passed)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    all_vectors()
        .iter()
        .map(|v| {
            let ok = server_outcome(v) == v.expected && client_outcome(v) == v.expected;
            (v.name.to_string(), ok)
        })
        .collect()
}

/// The vector table as JSON, for implementations in other languages.
pub fn export_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
