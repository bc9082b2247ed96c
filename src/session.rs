//! Local identity.
//!
//! The display name is the only identity there is: it is kept in the
//! durable store under [`USERNAME_KEY`] and copied into chat messages.

use crate::store::StoreHandle;
use crate::types::is_blank;

pub const USERNAME_KEY: &str = "username";

/// `get/set/clear` access to the persisted display name.
#[derive(Clone)]
pub struct SessionStore {
    store: StoreHandle,
}

impl SessionStore {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Option<String> {
        self.store.get(USERNAME_KEY)
    }

    pub fn set(&self, name: &str) {
        if let Err(e) = self.store.set(USERNAME_KEY, name) {
            tracing::warn!("Failed to persist username: {e}");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(USERNAME_KEY) {
            tracing::warn!("Failed to clear persisted username: {e}");
        }
    }
}

/// The single active identity of this client, if any.
pub struct Session {
    store: SessionStore,
    username: Option<String>,
}

impl Session {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            username: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns `false` and changes nothing when `name` is blank.
    pub fn login(&mut self, name: &str) -> bool {
        if is_blank(name) {
            return false;
        }
        self.store.set(name);
        self.username = Some(name.to_string());
        tracing::info!(user = name, "Logged in");
        true
    }

    /// Re-activates a previously persisted session.
    pub fn restore(&mut self) -> bool {
        match self.store.get() {
            Some(name) if !is_blank(&name) => {
                tracing::debug!(user = %name, "Restored session");
                self.username = Some(name);
                true
            }
            _ => false,
        }
    }

    pub fn logout(&mut self) {
        self.store.clear();
        if let Some(name) = self.username.take() {
            tracing::info!(user = %name, "Logged out");
        }
    }
}
