//! Per-backend authentication state.
//!
//! A [`Session`] holds the current token and the cached user profile. Both are
//! published through `tokio::sync::watch` channels so UI code can follow
//! changes; every mutation sends exactly one new value. Token changes are
//! written through to a [`TokenStore`] immediately.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::models::User;

/// Durable string storage for auth tokens, keyed per backend.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`; `None` removes the entry.
    fn set(&self, key: &str, value: Option<&str>);
}

/// In-process [`TokenStore`], used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        match value {
            Some(v) => values.insert(key.to_string(), v.to_string()),
            None => values.remove(key),
        };
    }
}

/// Authentication state of one backend adapter.
pub struct Session {
    storage_key: &'static str,
    store: Arc<dyn TokenStore>,
    token: watch::Sender<Option<String>>,
    profile: watch::Sender<Option<User>>,
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Restore the session saved under `storage_key`.
    pub fn load(storage_key: &'static str, store: Arc<dyn TokenStore>) -> Self {
        let token = store.get(storage_key).filter(|t| !t.is_empty());
        tracing::debug!(
            key = storage_key,
            authenticated = token.is_some(),
            "session loaded"
        );
        Self {
            storage_key,
            store,
            token: watch::channel(token).0,
            profile: watch::channel(None).0,
            refresh: Mutex::new(None),
        }
    }

    pub fn storage_key(&self) -> &'static str {
        self.storage_key
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    pub fn subscribe_token(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }

    pub fn profile(&self) -> Option<User> {
        self.profile.borrow().clone()
    }

    pub fn subscribe_profile(&self) -> watch::Receiver<Option<User>> {
        self.profile.subscribe()
    }

    /// Replace the token, persist it and notify subscribers.
    ///
    /// Returns `true` if the session is now authenticated. An empty string is
    /// treated as no token.
    pub fn set_token(&self, token: Option<String>) -> bool {
        let token = token.filter(|t| !t.is_empty());
        let authenticated = token.is_some();

        self.store.set(self.storage_key, token.as_deref());
        self.token.send_replace(token);

        if !authenticated {
            self.cancel_refresh();
        }
        tracing::debug!(key = self.storage_key, authenticated, "token updated");
        authenticated
    }

    pub(crate) fn set_profile(&self, profile: Option<User>) {
        self.profile.send_replace(profile);
    }

    /// Drop the token and cached profile.
    pub fn clear(&self) {
        self.set_token(None);
        self.set_profile(None);
    }

    /// Called when the backend rejects `rejected`. Only signs out if that is
    /// still the current token.
    pub(crate) fn invalidate(&self, rejected: Option<&str>) {
        if self.token().as_deref() != rejected {
            tracing::debug!(key = self.storage_key, "rejected token already replaced");
            return;
        }
        if rejected.is_some() {
            tracing::info!(key = self.storage_key, "token rejected, signing out");
        }
        self.clear();
    }

    /// Run a profile refresh in the background, replacing (and aborting) any
    /// refresh still in flight. Does nothing outside a tokio runtime.
    pub(crate) fn spawn_refresh<F>(self: &Arc<Self>, fetch: F)
    where
        F: Future<Output = Result<User, ApiError>> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key = self.storage_key, "no runtime, skipping profile refresh");
            return;
        };

        let session = Arc::clone(self);
        let handle = runtime.spawn(async move {
            match fetch.await {
                Ok(user) => {
                    tracing::debug!(key = session.storage_key, user = %user.name, "profile refreshed");
                    session.set_profile(Some(user));
                }
                Err(e) => {
                    tracing::warn!(key = session.storage_key, error = %e, "profile refresh failed");
                }
            }
        });

        let mut slot = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_refresh(&self) {
        let mut slot = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("storage_key", &self.storage_key)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
