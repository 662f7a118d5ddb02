//! Permission strings.
//!
//! A permission is either the universal grant `*` or a three-part
//! `resource:action:scope` token in which any segment may be `*`:
//!
//! ```text
//! apikey:delete:all     delete any API key
//! apikey:*:all          every apikey action, across all owners
//! *:delete:*            delete anything
//! *                     everything
//! ```
//!
//! `*` and `*:*:*` grant the same thing but are distinct strings. The grammar
//! is ASCII, case-sensitive, and whitespace-free.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// The universal wildcard, both as a whole grant and as a segment.
pub const WILDCARD: &str = "*";

/// A strictly parsed permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    /// The bare `*` grant.
    Universal,

    /// A `resource:action:scope` grant.
    Scoped {
        resource: String,
        action: String,
        scope: String,
    },
}

impl Permission {
    /// Build a scoped permission from its segments.
    pub fn scoped(
        resource: impl Into<String>,
        action: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Permission::Scoped {
            resource: resource.into(),
            action: action.into(),
            scope: scope.into(),
        }
    }

    /// Parse a permission string, rejecting anything outside the grammar.
    pub fn parse(input: &str) -> Result<Self, PermissionError> {
        if input.is_empty() {
            return Err(PermissionError::Empty);
        }
        if !input.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(PermissionError::InvalidCharacter(input.to_string()));
        }
        if input == WILDCARD {
            return Ok(Permission::Universal);
        }

        let parts: Vec<&str> = input.split(':').collect();
        if parts.len() != 3 {
            return Err(PermissionError::WrongArity {
                input: input.to_string(),
                parts: parts.len(),
            });
        }

        for (segment, position) in parts.iter().zip(["resource", "action", "scope"]) {
            if segment.is_empty() {
                return Err(PermissionError::EmptySegment {
                    input: input.to_string(),
                    position,
                });
            }
        }

        Ok(Permission::scoped(parts[0], parts[1], parts[2]))
    }

    /// Whether this grant satisfies `required`.
    ///
    /// Same semantics as [`crate::matches`] for a single grant.
    pub fn covers(&self, required: &Permission) -> bool {
        match self {
            Permission::Universal => true,
            Permission::Scoped {
                resource,
                action,
                scope,
            } => {
                let grant = Segments {
                    resource,
                    action,
                    scope,
                };
                match required {
                    Permission::Universal => grant.covers(&Segments::UNIVERSAL),
                    Permission::Scoped {
                        resource,
                        action,
                        scope,
                    } => grant.covers(&Segments {
                        resource,
                        action,
                        scope,
                    }),
                }
            }
        }
    }

    /// Whether this is `*` or `*:*:*`.
    pub fn is_universal(&self) -> bool {
        self.covers(&Permission::Universal)
    }

    /// The resource segment, if scoped.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Permission::Universal => None,
            Permission::Scoped { resource, .. } => Some(resource),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Universal => f.write_str(WILDCARD),
            Permission::Scoped {
                resource,
                action,
                scope,
            } => write!(f, "{}:{}:{}", resource, action, scope),
        }
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Permission::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.to_string()
    }
}

/// Borrowed `resource:action:scope` view used by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segments<'a> {
    pub(crate) resource: &'a str,
    pub(crate) action: &'a str,
    pub(crate) scope: &'a str,
}

impl<'a> Segments<'a> {
    pub(crate) const UNIVERSAL: Segments<'static> = Segments {
        resource: WILDCARD,
        action: WILDCARD,
        scope: WILDCARD,
    };

    /// Split into exactly three segments; anything else is malformed.
    pub(crate) fn split(input: &'a str) -> Option<Self> {
        let mut parts = input.split(':');
        let resource = parts.next()?;
        let action = parts.next()?;
        let scope = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Segments {
            resource,
            action,
            scope,
        })
    }

    /// Segment-wise match where a `*` in the grant matches any value.
    pub(crate) fn covers(&self, required: &Segments<'_>) -> bool {
        segment_covers(self.resource, required.resource)
            && segment_covers(self.action, required.action)
            && segment_covers(self.scope, required.scope)
    }
}

fn segment_covers(granted: &str, required: &str) -> bool {
    granted == required || granted == WILDCARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_universal_and_scoped() {
        assert_eq!(Permission::parse("*").unwrap(), Permission::Universal);
        assert_eq!(
            Permission::parse("apikey:delete:all").unwrap(),
            Permission::scoped("apikey", "delete", "all")
        );
        assert_eq!(
            Permission::parse("*:*:*").unwrap(),
            Permission::scoped("*", "*", "*")
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Permission::parse(""), Err(PermissionError::Empty));
        assert!(matches!(
            Permission::parse("apikey:delete"),
            Err(PermissionError::WrongArity { parts: 2, .. })
        ));
        assert!(matches!(
            Permission::parse("academy:content:create:self_domain"),
            Err(PermissionError::WrongArity { parts: 4, .. })
        ));
        assert!(matches!(
            Permission::parse("apikey::all"),
            Err(PermissionError::EmptySegment {
                position: "action",
                ..
            })
        ));
        assert!(matches!(
            Permission::parse("apikey:delete :all"),
            Err(PermissionError::InvalidCharacter(_))
        ));
        assert!(matches!(
            Permission::parse("clé:read:all"),
            Err(PermissionError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn test_display_reproduces_input() {
        for input in ["*", "*:*:*", "apikey:delete:all", "user:write:non_admin"] {
            assert_eq!(Permission::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn test_case_sensitive() {
        let grant = Permission::parse("apikey:delete:all").unwrap();
        let upper = Permission::parse("APIKEY:delete:all").unwrap();
        assert!(!grant.covers(&upper));
    }

    #[test]
    fn test_covers() {
        let grant = Permission::parse("apikey:*:all").unwrap();
        assert!(grant.covers(&Permission::parse("apikey:delete:all").unwrap()));
        assert!(!grant.covers(&Permission::parse("apikey:delete:own").unwrap()));
        assert!(!grant.covers(&Permission::Universal));

        assert!(Permission::Universal.covers(&Permission::parse("x:y:z").unwrap()));
        assert!(Permission::parse("*:*:*").unwrap().is_universal());
        assert!(!Permission::parse("*:*:own").unwrap().is_universal());
    }

    #[test]
    fn test_serde_uses_wire_form() {
        let p: Permission = serde_json::from_str("\"user:read:all\"").unwrap();
        assert_eq!(p, Permission::scoped("user", "read", "all"));
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"user:read:all\"");
        assert!(serde_json::from_str::<Permission>("\"user:read\"").is_err());
    }

    #[test]
    fn test_segments_split() {
        assert!(Segments::split("a:b:c").is_some());
        assert!(Segments::split("a:b").is_none());
        assert!(Segments::split("a:b:c:d").is_none());
        assert!(Segments::split("*").is_none());
    }
}
