//! Session change notification.
//!
//! A [`SessionFeed`] holds the client's current [`SessionView`]; gates
//! subscribe to it and re-evaluate when the session loads, changes or ends.

use tokio::sync::watch;

use crate::gate::{CapabilityGate, Visibility};
use crate::session::{ClientSession, SessionView};

/// Publisher of the current session view. Starts out loading.
pub struct SessionFeed {
    tx: watch::Sender<SessionView>,
}

impl SessionFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionView::Loading);
        Self { tx }
    }

    pub fn current(&self) -> SessionView {
        self.tx.borrow().clone()
    }

    /// Replace the current view and notify subscribers.
    pub fn publish(&self, view: SessionView) {
        tracing::debug!(
            loading = view.is_loading(),
            principal = view.session().map(|s| s.id.as_str()),
            "client session changed"
        );
        self.tx.send_replace(view);
    }

    pub fn sign_in(&self, session: ClientSession) {
        self.publish(SessionView::Authenticated(session));
    }

    pub fn sign_out(&self) {
        self.publish(SessionView::Anonymous);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.tx.subscribe()
    }

    /// Follow a gate's decision as the session changes.
    pub fn watch(&self, gate: CapabilityGate) -> GateWatcher {
        GateWatcher {
            gate,
            rx: self.subscribe(),
        }
    }
}

impl Default for SessionFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A gate bound to a [`SessionFeed`].
pub struct GateWatcher {
    gate: CapabilityGate,
    rx: watch::Receiver<SessionView>,
}

impl GateWatcher {
    /// Decision for the latest view.
    pub fn visibility(&self) -> Visibility {
        self.gate.evaluate(&self.rx.borrow())
    }

    /// Wait for the next session change and return the new decision.
    ///
    /// `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<Visibility> {
        self.rx.changed().await.ok()?;
        Some(self.gate.evaluate(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permgate_core::Principal;

    fn admin() -> ClientSession {
        ClientSession::from(
            Principal::new("ops")
                .with_roles(["admin"])
                .with_permissions(["user:write:all"]),
        )
    }

    #[test]
    fn test_feed_starts_loading() {
        let feed = SessionFeed::new();
        assert_eq!(feed.current(), SessionView::Loading);

        feed.sign_in(admin());
        assert_eq!(feed.current().session(), Some(&admin()));

        feed.sign_out();
        assert_eq!(feed.current(), SessionView::Anonymous);
    }

    #[tokio::test]
    async fn test_watcher_follows_session() {
        let feed = SessionFeed::new();
        let mut watcher = feed.watch(CapabilityGate::new().role(["admin"]));
        assert_eq!(watcher.visibility(), Visibility::Fallback);

        feed.sign_in(admin());
        assert_eq!(watcher.changed().await, Some(Visibility::Show));

        feed.sign_out();
        assert_eq!(watcher.changed().await, Some(Visibility::Fallback));

        drop(feed);
        assert_eq!(watcher.changed().await, None);
    }
}
