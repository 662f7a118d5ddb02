//! Service configuration.

use serde::{Deserialize, Serialize};

use permgate_audit::AuditPolicy;
use permgate_core::{Permission, SUPERADMIN_ROLE};
use permgate_guard::{SessionStore, TokenSessionResolver, DEFAULT_SESSION_COOKIE};

use crate::error::{AuthzError, Result};

/// Configuration for [`Authz`](crate::Authz).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// What an audit write failure means for the request.
    pub audit_policy: AuditPolicy,
    /// Role name treated as superadmin.
    pub superadmin_role: String,
    /// Permission required to list audit records.
    pub audit_read_permission: String,
    /// Upper bound on records returned by one audit listing.
    pub audit_listing_limit: usize,
    /// Cookie carrying the session token.
    pub session_cookie: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            audit_policy: AuditPolicy::BestEffort,
            superadmin_role: SUPERADMIN_ROLE.to_string(),
            audit_read_permission: "audit:read:all".to_string(),
            audit_listing_limit: 1000,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl AuthConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AuthzError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Permission::parse(&self.audit_read_permission).map_err(|e| {
            AuthzError::Config(format!("audit_read_permission: {}", e))
        })?;

        if self.superadmin_role.trim().is_empty() {
            return Err(AuthzError::Config("superadmin_role is empty".into()));
        }
        if self.session_cookie.is_empty() {
            return Err(AuthzError::Config("session_cookie is empty".into()));
        }
        if self.audit_listing_limit == 0 {
            return Err(AuthzError::Config("audit_listing_limit must be positive".into()));
        }
        Ok(())
    }

    /// A token resolver reading this config's session cookie.
    pub fn session_resolver<S: SessionStore>(&self, store: S) -> TokenSessionResolver<S> {
        TokenSessionResolver::new(store).with_cookie_name(self.session_cookie.clone())
    }
}
