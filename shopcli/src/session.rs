// src/session.rs
//! Process-local cache of the authenticated user.
//!
//! At most one current value, pushed to subscribers on change. Nothing is
//! persisted: after a restart the cache is rehydrated by a cookie-backed
//! call to the current-user endpoint.

use serde::Deserialize;
use tokio::sync::watch;

/// User shape returned by the API. The id is opaque to the client.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Clone)]
pub struct SessionCache {
    tx: watch::Sender<Option<SessionUser>>,
}

impl SessionCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record a successful authentication.
    pub fn set(&self, user: SessionUser) {
        self.tx.send_replace(Some(user));
    }

    /// Drop the session (logout, or a failed current-user check).
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
