use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::watch;

use crate::core::time::{format_rfc3339, parse_rfc3339};
use crate::schemas::user::User;
use crate::storage::{keys, KeyValueStore};

/// Process-wide holder of the authenticated user, the local-storage-backed
/// analog of the original client's broadcast auth state. Reads go to the
/// store on demand (the token may be cleared by another handle); the current
/// user is mirrored into a watch channel for subscribers.
#[derive(Debug, Clone)]
pub(crate) struct AuthSession {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<Option<User>>,
}

impl AuthSession {
    /// Restores the session from storage: a stored user with an unexpired
    /// token becomes the current user, anything else clears the leftovers.
    pub(crate) fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let session = Self { inner: Arc::new(Inner { store, current: watch::channel(None).0 }) };

        let user = session.stored_user();
        if user.is_some() && session.stored_token().is_some() && !session.token_expired() {
            tracing::debug!("Restored session from storage");
            session.inner.current.send_replace(user);
        } else if user.is_some() || session.stored_token().is_some() {
            tracing::debug!("Discarding stale session data");
            session.clear();
        }

        session
    }

    /// Stores the token with an absolute expiry, stores the user, and
    /// notifies subscribers. Called on successful sign-in.
    pub(crate) fn establish(&self, token: &str, ttl_seconds: u64, user: &User) {
        let expiry = OffsetDateTime::now_utc() + Duration::seconds(ttl_seconds as i64);
        self.inner.store.put(keys::TOKEN, token);
        self.inner.store.put(keys::TOKEN_EXPIRY, &format_rfc3339(expiry));

        match serde_json::to_string(user) {
            Ok(json) => self.inner.store.put(keys::USER_INFO, &json),
            Err(err) => tracing::error!(error = %err, "Failed to encode user for storage"),
        }

        self.inner.current.send_replace(Some(user.clone()));
    }

    /// Clears every piece of auth state and notifies subscribers.
    pub(crate) fn clear(&self) {
        self.inner.store.remove(keys::TOKEN);
        self.inner.store.remove(keys::TOKEN_EXPIRY);
        self.inner.store.remove(keys::USER_INFO);
        self.inner.store.remove(keys::GUEST_MODE);
        self.inner.current.send_replace(None);
    }

    pub(crate) fn current(&self) -> Option<User> {
        self.inner.current.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.current.subscribe()
    }

    /// The stored token if present and not past its local expiry.
    pub(crate) fn token(&self) -> Option<String> {
        if self.token_expired() {
            return None;
        }
        self.stored_token()
    }

    pub(crate) fn stored_token(&self) -> Option<String> {
        self.inner.store.get(keys::TOKEN).filter(|token| !token.is_empty())
    }

    /// Expired when the token or its expiry record is missing, unparsable,
    /// or in the past — absence of evidence is treated as expiry.
    pub(crate) fn token_expired(&self) -> bool {
        if self.stored_token().is_none() {
            return true;
        }
        let Some(raw) = self.inner.store.get(keys::TOKEN_EXPIRY) else {
            return true;
        };
        let Some(expiry) = parse_rfc3339(raw.trim()) else {
            return true;
        };
        OffsetDateTime::now_utc() > expiry
    }

    pub(crate) fn set_guest_mode(&self, enabled: bool) {
        if enabled {
            self.inner.store.put(keys::GUEST_MODE, "true");
        } else {
            self.inner.store.remove(keys::GUEST_MODE);
        }
    }

    pub(crate) fn is_guest_mode(&self) -> bool {
        self.inner.store.get(keys::GUEST_MODE).as_deref() == Some("true")
    }

    fn stored_user(&self) -> Option<User> {
        let raw = self.inner.store.get(keys::USER_INFO)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::error!(error = %err, "Failed to decode stored user");
                None
            }
        }
    }
}
