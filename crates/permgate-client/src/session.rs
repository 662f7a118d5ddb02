//! Client-visible session state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use permgate_core::{Principal, PrincipalId};

/// The client-visible projection of a principal.
///
/// Same wire shape as [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSession {
    #[serde(rename = "principalId")]
    pub id: PrincipalId,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl From<&Principal> for ClientSession {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            roles: principal.roles.clone(),
            permissions: principal.permissions.clone(),
        }
    }
}

impl From<Principal> for ClientSession {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            roles: principal.roles,
            permissions: principal.permissions,
        }
    }
}

/// What the client currently knows about its session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionView {
    /// Still fetching the session.
    #[default]
    Loading,
    /// Fetched, and there is none.
    Anonymous,
    Authenticated(ClientSession),
}

impl SessionView {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionView::Loading)
    }

    pub fn session(&self) -> Option<&ClientSession> {
        match self {
            SessionView::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

impl From<Option<ClientSession>> for SessionView {
    fn from(session: Option<ClientSession>) -> Self {
        session.map_or(SessionView::Anonymous, SessionView::Authenticated)
    }
}
