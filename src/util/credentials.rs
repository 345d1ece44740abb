//! Single-slot bearer-token store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Written by the session controller on login/resume, cleared on logout, and
//! cleared by the shared HTTP client whenever the backend answers 401. No
//! expiry is tracked here; staleness is only discovered by a rejected request.

use std::sync::Arc;

use super::storage::KeyValueStore;

pub const TOKEN_STORAGE_KEY: &str = "id_token";

/// Handle to the persisted bearer token. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored token, or `None` when the slot is empty.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.store.get(TOKEN_STORAGE_KEY).filter(|token| !token.is_empty())
    }

    /// Replace the stored token. Persistence failures are logged, not raised.
    pub fn set(&self, token: &str) {
        if let Err(e) = self.store.set(TOKEN_STORAGE_KEY, token) {
            tracing::warn!(error = %e, "failed to persist bearer token");
        }
    }

    /// Empty the slot. Persistence failures are logged, not raised.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TOKEN_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to clear bearer token");
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").field("present", &self.get().is_some()).finish()
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
