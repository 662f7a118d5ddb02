//! Capability checks and the render gate.

use permgate_core::{has_any_role, matches_any};

use crate::session::SessionView;

/// Result of a single capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub granted: bool,
    pub loading: bool,
}

impl Capability {
    const LOADING: Capability = Capability {
        granted: false,
        loading: true,
    };

    fn settled(granted: bool) -> Self {
        Self {
            granted,
            loading: false,
        }
    }
}

/// Whether the current session holds one of `required`.
pub fn permission_status<R>(view: &SessionView, required: R) -> Capability
where
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    match view {
        SessionView::Loading => Capability::LOADING,
        SessionView::Anonymous => Capability::settled(false),
        SessionView::Authenticated(session) => {
            Capability::settled(matches_any(&session.permissions, required))
        }
    }
}

/// Whether the current session has one of `required` roles.
pub fn role_status<R>(view: &SessionView, required: R) -> Capability
where
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    match view {
        SessionView::Loading => Capability::LOADING,
        SessionView::Anonymous => Capability::settled(false),
        SessionView::Authenticated(session) => {
            Capability::settled(has_any_role(&session.roles, required))
        }
    }
}

/// Render decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Show,
    Fallback,
}

/// Declarative gate around a piece of UI.
///
/// With both a permission and a role requirement, both must hold. With
/// neither, content is shown once the session has loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityGate {
    permissions: Option<Vec<String>>,
    roles: Option<Vec<String>>,
}

impl CapabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require one of these permissions.
    pub fn permission<R>(mut self, required: R) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        self.permissions = Some(to_strings(required));
        self
    }

    /// Require one of these roles.
    pub fn role<R>(mut self, required: R) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        self.roles = Some(to_strings(required));
        self
    }

    pub fn evaluate(&self, view: &SessionView) -> Visibility {
        if view.is_loading() {
            return Visibility::Fallback;
        }

        if let Some(permissions) = &self.permissions {
            if !permission_status(view, permissions).granted {
                return Visibility::Fallback;
            }
        }

        if let Some(roles) = &self.roles {
            if !role_status(view, roles).granted {
                return Visibility::Fallback;
            }
        }

        Visibility::Show
    }

    /// Pick `children` or `fallback`.
    pub fn render<T>(&self, view: &SessionView, children: T, fallback: T) -> T {
        match self.evaluate(view) {
            Visibility::Show => children,
            Visibility::Fallback => fallback,
        }
    }

    /// Like [`render`](Self::render) with an empty fallback.
    pub fn show<T>(&self, view: &SessionView, children: T) -> Option<T> {
        self.render(view, Some(children), None)
    }
}

fn to_strings<R>(items: R) -> Vec<String>
where
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect()
}
