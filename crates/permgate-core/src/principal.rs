//! The authenticated principal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::matcher::{matches, matches_all, matches_any};
use crate::role::{self, Role};
use crate::types::PrincipalId;

/// The actor making a request: identity, role names, and the permission set
/// flattened from those roles when the session was built.
///
/// The authorization core never walks roles again after construction; the
/// guard only reads a principal, it never mutates one.
///
/// Serializes to the session boundary shape
/// `{ "principalId", "roles", "permissions" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "principalId")]
    pub id: PrincipalId,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Principal {
    /// Create a principal with no roles and no permissions.
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            permissions: BTreeSet::new(),
        }
    }

    /// Flatten a list of roles into a principal.
    ///
    /// Role names keep their given order with duplicates dropped; the
    /// permission set is the union of every role's permissions.
    pub fn from_roles<'a>(
        id: impl Into<PrincipalId>,
        roles: impl IntoIterator<Item = &'a Role>,
    ) -> Self {
        let mut principal = Self::new(id);
        for role in roles {
            if !principal.roles.contains(&role.name) {
                principal.roles.push(role.name.clone());
            }
            principal
                .permissions
                .extend(role.permissions.iter().cloned());
        }
        principal
    }

    /// Add role names.
    pub fn with_roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        for role in roles {
            let role = role.into();
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    /// Add granted permission strings.
    pub fn with_permissions<S: Into<String>>(
        mut self,
        permissions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Whether this principal holds `required`.
    pub fn can(&self, required: &str) -> bool {
        matches(&self.permissions, required)
    }

    /// Whether this principal holds at least one of `required`.
    pub fn can_any<R>(&self, required: R) -> bool
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        matches_any(&self.permissions, required)
    }

    /// Whether this principal holds every one of `required`.
    pub fn can_all<R>(&self, required: R) -> bool
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        matches_all(&self.permissions, required)
    }

    pub fn has_role(&self, required: &str) -> bool {
        role::has_role(&self.roles, required)
    }

    pub fn has_any_role<R>(&self, required: R) -> bool
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        role::has_any_role(&self.roles, required)
    }

    /// Whether the principal holds the built-in [`SUPERADMIN_ROLE`].
    ///
    /// A service configured with another superadmin role name checks it
    /// through the guard instead.
    ///
    /// [`SUPERADMIN_ROLE`]: crate::SUPERADMIN_ROLE
    pub fn is_superadmin(&self) -> bool {
        role::is_superadmin(&self.roles)
    }

    /// Whether this principal is the owner recorded on a resource.
    pub fn owns(&self, owner: &PrincipalId) -> bool {
        &self.id == owner
    }
}
