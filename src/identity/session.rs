use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::principal::Identity;
use crate::storage::{PreferenceStore, KEY_PERSIST};

/// Opaque bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new<S: Into<String>>(token: S) -> Self { Self(token.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("AccessToken(<redacted>)") }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Authenticated {
    token: AccessToken,
    identity: Identity,
}

/// Token and identity, present or absent together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    auth: Option<Authenticated>,
}

impl Session {
    pub fn anonymous() -> Self { Self { auth: None } }

    pub fn authenticated(token: AccessToken, identity: Identity) -> Self {
        Self { auth: Some(Authenticated { token, identity }) }
    }

    pub fn access_token(&self) -> Option<&AccessToken> { self.auth.as_ref().map(|a| &a.token) }

    pub fn identity(&self) -> Option<&Identity> { self.auth.as_ref().map(|a| &a.identity) }

    pub fn is_authenticated(&self) -> bool { self.auth.is_some() }
}

struct Inner {
    session: watch::Sender<Session>,
    stay_signed_in: AtomicBool,
    preferences: Arc<dyn PreferenceStore>,
}

/// Single writer of the session and the stay-signed-in preference.
/// Cloning shares the same state; subscribers are notified on every replace.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        let stay_signed_in = preferences.get_bool(KEY_PERSIST);
        let (tx, _rx) = watch::channel(Session::anonymous());
        Self {
            inner: Arc::new(Inner {
                session: tx,
                stay_signed_in: AtomicBool::new(stay_signed_in),
                preferences,
            }),
        }
    }

    pub fn session(&self) -> Session { self.inner.session.borrow().clone() }

    pub fn has_access_token(&self) -> bool { self.inner.session.borrow().access_token().is_some() }

    /// Replace the whole session. There is no partial update.
    pub fn set_session(&self, session: Session) {
        match session.identity() {
            Some(id) => info!(target: "session", user = %id.id, role = %id.role, "session established"),
            None => debug!(target: "session", "session cleared"),
        }
        self.inner.session.send_replace(session);
    }

    pub fn clear(&self) { self.set_session(Session::anonymous()) }

    pub fn subscribe(&self) -> watch::Receiver<Session> { self.inner.session.subscribe() }

    pub fn stay_signed_in(&self) -> bool { self.inner.stay_signed_in.load(Ordering::SeqCst) }

    /// Update the preference and write it through to durable storage.
    /// A failed write is logged and otherwise ignored.
    pub fn set_stay_signed_in(&self, value: bool) {
        self.inner.stay_signed_in.store(value, Ordering::SeqCst);
        if let Err(e) = self.inner.preferences.set(KEY_PERSIST, if value { "true" } else { "false" }) {
            warn!(target: "session", error = %e, "could not persist stay-signed-in preference");
        }
    }

    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> { &self.inner.preferences }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ClientResult};
    use crate::identity::Role;
    use crate::storage::MemoryStore;

    fn identity() -> Identity {
        Identity { id: "c1".into(), full_name: "Mona Client".into(), phone_number: "201000000001".into(), email: None, role: Role::Client }
    }

    #[test]
    fn token_and_identity_travel_together() {
        let anon = Session::anonymous();
        assert!(anon.access_token().is_none() && anon.identity().is_none());
        let s = Session::authenticated(AccessToken::new("t"), identity());
        assert!(s.access_token().is_some() && s.identity().is_some());
        assert!(!format!("{:?}", s).contains("\"t\""));
    }

    #[test]
    fn replace_notifies_subscribers() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();
        store.set_session(Session::authenticated(AccessToken::new("t1"), identity()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().access_token().map(|t| t.as_str().to_string()), Some("t1".into()));
        store.clear();
        assert!(!store.has_access_token());
    }

    #[test]
    fn preference_writes_through() {
        let prefs = Arc::new(MemoryStore::new());
        let store = SessionStore::new(prefs.clone());
        assert!(!store.stay_signed_in());
        store.set_stay_signed_in(true);
        assert_eq!(prefs.get(KEY_PERSIST).as_deref(), Some("true"));
        let reopened = SessionStore::new(prefs);
        assert!(reopened.stay_signed_in());
    }

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<String> { None }
        fn set(&self, _key: &str, _value: &str) -> ClientResult<()> { Err(ClientError::storage("read-only")) }
        fn remove(&self, _key: &str) -> ClientResult<()> { Err(ClientError::storage("read-only")) }
    }

    #[test]
    fn failed_preference_write_is_not_fatal() {
        let store = SessionStore::new(Arc::new(BrokenStore));
        store.set_stay_signed_in(true);
        assert!(store.stay_signed_in());
    }
}
