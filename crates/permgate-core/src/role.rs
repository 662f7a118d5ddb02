//! Roles and the role catalog.
//!
//! Roles are a login-time input: the identity provider resolves a user's
//! role names, and [`RoleCatalog::flatten`] (or [`Principal::from_roles`])
//! turns them into a flat permission set. Nothing here is consulted during
//! a permission check.
//!
//! [`Principal::from_roles`]: crate::Principal::from_roles

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::permission::Permission;
use crate::principal::Principal;
use crate::types::PrincipalId;

/// Name of the role that bypasses every permission check.
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub description: String,

    /// System roles ship with the platform and cannot be deleted by users.
    #[serde(default)]
    pub is_system: bool,

    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Create a custom (non-system) role with no permissions.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_system: false,
            permissions: BTreeSet::new(),
        }
    }

    /// Create a system role.
    pub fn system(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            is_system: true,
            ..Self::new(name, description)
        }
    }

    /// Add permissions to this role.
    pub fn with_permissions<S: Into<String>>(
        mut self,
        permissions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Permissions that do not follow the three-part grammar.
    ///
    /// These still work as exact-match grants; callers that want to keep
    /// the catalog clean can surface them.
    pub fn nonconforming_permissions(&self) -> Vec<&str> {
        self.permissions
            .iter()
            .filter(|p| Permission::parse(p).is_err())
            .map(String::as_str)
            .collect()
    }
}

/// The set of roles known to the platform.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: BTreeMap<String, Role>,
}

impl RoleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform's built-in system roles.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        let roles = [
            Role::system(SUPERADMIN_ROLE, "Full system access with no restrictions")
                .with_permissions(["*"]),
            Role::system(
                "admin",
                "Operational administration without system policy changes",
            )
            .with_permissions([
                "user:read:all",
                "user:write:non_admin",
                "role:read:all",
                "role:assign:non_admin",
                "academy:content:read",
                "academy:content:create:all",
                "academy:content:approve",
                "academy:content:delete",
                "apikey:read:all",
                "apikey:write:other",
                "n8n:workflow:read:all",
                "n8n:workflow:execute:all",
                "n8n:workflow:manage:all",
                "audit:read:all",
                "system:config:read",
            ]),
            Role::system("domain_owner", "Domain/team leadership with scoped permissions")
                .with_permissions([
                    "user:read:self",
                    "academy:content:read",
                    "academy:content:create:self_domain",
                    "apikey:read:self",
                    "apikey:write:self",
                    "n8n:workflow:read:team",
                    "n8n:workflow:execute:team",
                    "n8n:workflow:create:team",
                    "audit:read:self",
                ]),
            Role::system("standard_user", "Regular user with basic platform access")
                .with_permissions([
                    "user:read:self",
                    "academy:content:read",
                    "academy:content:draft_create",
                    "apikey:read:self",
                    "apikey:write:self",
                    "apikey:delete:self",
                    "n8n:workflow:read:self",
                    "n8n:workflow:execute:self",
                    "n8n:workflow:create:self",
                    "audit:read:self",
                ]),
            Role::system("read_only", "View-only access for reporting and auditing")
                .with_permissions(["user:read:self", "academy:content:read", "audit:read:self"]),
        ];
        for role in roles {
            catalog.roles.insert(role.name.clone(), role);
        }
        catalog
    }

    /// Add a role. Names are unique.
    pub fn insert(&mut self, role: Role) -> Result<()> {
        if self.roles.contains_key(&role.name) {
            return Err(CoreError::DuplicateRole(role.name));
        }
        self.roles.insert(role.name.clone(), role);
        Ok(())
    }

    /// Delete a custom role. System roles are refused.
    pub fn remove(&mut self, name: &str) -> Result<Role> {
        match self.roles.get(name) {
            None => Err(CoreError::RoleNotFound(name.to_string())),
            Some(role) if role.is_system => Err(CoreError::SystemRole(name.to_string())),
            Some(_) => self
                .roles
                .remove(name)
                .ok_or_else(|| CoreError::RoleNotFound(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Iterate roles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Build a principal from the role names the identity provider assigned.
    ///
    /// Unknown names are skipped.
    pub fn flatten<S: AsRef<str>>(
        &self,
        id: impl Into<PrincipalId>,
        role_names: impl IntoIterator<Item = S>,
    ) -> Principal {
        let roles: Vec<&Role> = role_names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let role = self.roles.get(name);
                if role.is_none() {
                    tracing::debug!(role = name, "ignoring unknown role");
                }
                role
            })
            .collect();
        Principal::from_roles(id, roles)
    }
}

/// Whether `roles` contains `required`.
pub fn has_role<S: AsRef<str>>(roles: &[S], required: &str) -> bool {
    roles.iter().any(|r| r.as_ref() == required)
}

/// Whether `roles` contains at least one of `required`.
pub fn has_any_role<S, R>(roles: &[S], required: R) -> bool
where
    S: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    required
        .into_iter()
        .any(|needed| has_role(roles, needed.as_ref()))
}

/// Whether `roles` contains the superadmin role.
pub fn is_superadmin<S: AsRef<str>>(roles: &[S]) -> bool {
    has_role(roles, SUPERADMIN_ROLE)
}
