//! Proptest generators for property-based testing.

use proptest::prelude::*;

/// A single permission segment such as `apikey` or `self_domain`.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// A well-formed, wildcard-free `resource:action:scope` string.
pub fn permission() -> impl Strategy<Value = String> {
    (segment(), segment(), segment()).prop_map(|(r, a, s)| format!("{}:{}:{}", r, a, s))
}

fn grant_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => segment(),
        1 => Just("*".to_string()),
    ]
}

/// A grant: `*`, or three segments any of which may be `*`.
pub fn grant() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just("*".to_string()),
        9 => (grant_segment(), grant_segment(), grant_segment())
            .prop_map(|(r, a, s)| format!("{}:{}:{}", r, a, s)),
    ]
}

/// A set of grants as a principal would carry.
pub fn granted_set(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(grant(), 0..=max_len)
}

/// A string that does not have exactly three segments.
pub fn malformed() -> impl Strategy<Value = String> {
    prop_oneof![
        segment(),
        (segment(), segment()).prop_map(|(r, a)| format!("{}:{}", r, a)),
        (segment(), segment(), segment(), segment())
            .prop_map(|(r, a, s, x)| format!("{}:{}:{}:{}", r, a, s, x)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use permgate_core::{matches, Permission};

    proptest! {
        #[test]
        fn generated_permissions_parse(p in permission()) {
            prop_assert!(Permission::parse(&p).is_ok());
        }

        #[test]
        fn generated_grants_parse(g in grant()) {
            prop_assert!(Permission::parse(&g).is_ok());
        }

        #[test]
        fn malformed_strings_fail_strict_parse(m in malformed()) {
            prop_assert!(Permission::parse(&m).is_err());
        }

        #[test]
        fn malformed_required_matches_only_verbatim_or_universal(
            m in malformed(),
            granted in granted_set(6),
        ) {
            let expected = granted.iter().any(|g| g == "*" || *g == m);
            prop_assert_eq!(matches(&granted, &m), expected);
        }
    }
}
