//! The permission matcher.
//!
//! Decides whether a set of granted permission strings satisfies a required
//! permission string. Pure and deterministic; callable from any thread.
//!
//! Algorithm, for each grant `p`:
//!
//! 1. `p == "*"` matches everything.
//! 2. `p == required` (verbatim) matches.
//! 3. Otherwise both are split into `resource:action:scope` and compared
//!    segment by segment, a `*` segment in `p` matching any value.
//!
//! A required string that is neither `*` nor three-part is malformed. It is
//! not an error: it can only be satisfied by rules 1 and 2. Likewise a
//! malformed grant only ever matches verbatim. The source permission catalog
//! contains four-part keys (`academy:content:create:self_domain`) that rely
//! on this.
//!
//! A required `*` is satisfied only by a universal grant (`*` or `*:*:*`).

use crate::permission::{Segments, WILDCARD};

/// Whether `granted` satisfies `required`.
pub fn matches<I>(granted: I, required: &str) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let target = if required == WILDCARD {
        Some(Segments::UNIVERSAL)
    } else {
        Segments::split(required)
    };

    let allowed = granted.into_iter().any(|grant| {
        let grant = grant.as_ref();
        if grant == WILDCARD || grant == required {
            return true;
        }
        match (target, Segments::split(grant)) {
            (Some(target), Some(grant)) => grant.covers(&target),
            _ => false,
        }
    });

    // Catalog keys outside the three-part form are granted verbatim; only an
    // unmatched one is worth a warning.
    if target.is_none() {
        if allowed {
            tracing::debug!(required, "non-standard permission string matched exactly");
        } else {
            tracing::warn!(
                required,
                "malformed permission string, falling back to exact match"
            );
        }
    }

    allowed
}

/// Whether `granted` satisfies at least one of `required`.
///
/// An empty `required` list is never satisfied.
pub fn matches_any<I, R>(granted: I, required: R) -> bool
where
    I: IntoIterator + Clone,
    I::Item: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    required
        .into_iter()
        .any(|perm| matches(granted.clone(), perm.as_ref()))
}

/// Whether `granted` satisfies every one of `required`.
///
/// An empty `required` list is always satisfied.
pub fn matches_all<I, R>(granted: I, required: R) -> bool
where
    I: IntoIterator + Clone,
    I::Item: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    required
        .into_iter()
        .all(|perm| matches(granted.clone(), perm.as_ref()))
}
