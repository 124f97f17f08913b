//! Per-context observable identity.
//!
//! Each execution context ("tab") attaches one [`SessionContext`] to the
//! shared [`SessionStore`]. The context holds the current identity in a
//! watch channel and re-reads the store whenever the store's change
//! channel fires, so a logout performed in one context is reflected in
//! every other without a reload. UI code observes identity exclusively
//! through this type - nothing reads the store directly.

use std::sync::Arc;

use soko_core::Identity;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::SessionStore;

/// Process-wide (per-context) observable holding the current identity.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    identity: watch::Sender<Option<Identity>>,
    listener: JoinHandle<()>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl SessionContext {
    /// Attach a context to the store: initialize from `load()` and follow
    /// the store's change notifications from then on.
    ///
    /// Must be called within a tokio runtime; the listener task lives until
    /// the last clone of this context is dropped.
    #[must_use]
    pub fn attach(store: &SessionStore) -> Self {
        let initial = store.load().map(|session| session.identity().clone());
        let (identity, _) = watch::channel(initial);

        let listener = tokio::spawn(follow_store(
            store.clone(),
            store.subscribe(),
            identity.clone(),
        ));

        Self {
            inner: Arc::new(ContextInner { identity, listener }),
        }
    }

    /// The identity currently observed by this context, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.borrow().clone()
    }

    /// Watch identity changes (role transitions, logins, teardowns).
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity.subscribe()
    }

    /// Replace the observed identity. Reserved for the login/register/
    /// logout flows and the gateway's forced teardown; screens never set
    /// identity themselves.
    pub(crate) fn set(&self, identity: Option<Identity>) {
        self.inner.identity.send_replace(identity);
    }
}

/// Re-read the store on every change notification. Lagged receivers
/// coalesce to one re-read, which still converges on the latest record.
async fn follow_store(
    store: SessionStore,
    mut changes: broadcast::Receiver<()>,
    identity: watch::Sender<Option<Identity>>,
) {
    loop {
        match changes.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                let current = store.load().map(|session| session.identity().clone());
                identity.send_replace(current);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use soko_core::{Role, UserId};

    use crate::session::Session;

    use super::*;

    fn session(username: &str, role: Role) -> Session {
        Session::new(
            "token",
            Identity {
                id: UserId::new(1),
                username: username.to_string(),
                role,
            },
        )
    }

    #[tokio::test]
    async fn test_initializes_from_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::open(dir.path().join("session.json"));
        store.save(&session("jane", Role::Owner)).expect("save");

        let context = SessionContext::attach(&store);
        assert_eq!(
            context.identity().map(|identity| identity.username),
            Some("jane".to_string())
        );
    }

    #[tokio::test]
    async fn test_cross_context_logout_propagates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::open(dir.path().join("session.json"));
        store.save(&session("jane", Role::Customer)).expect("save");

        let tab_a = SessionContext::attach(&store);
        let tab_b = SessionContext::attach(&store);
        let mut observed = tab_b.watch();
        assert!(tab_b.identity().is_some());

        // Logout in tab A: clear the shared store
        store.clear();
        tab_a.set(None);

        // Tab B observes the change through the store notification alone
        observed.changed().await.expect("change notification");
        assert!(tab_b.identity().is_none());
    }

    #[tokio::test]
    async fn test_cross_context_login_propagates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::open(dir.path().join("session.json"));

        let tab_b = SessionContext::attach(&store);
        let mut observed = tab_b.watch();
        assert!(tab_b.identity().is_none());

        store.save(&session("wanjiku", Role::Customer)).expect("save");

        observed.changed().await.expect("change notification");
        assert_eq!(
            tab_b.identity().map(|identity| identity.username),
            Some("wanjiku".to_string())
        );
    }
}
