use lifedesk_shared::WorkspaceState;

use crate::serializer::encode_snapshot;
use crate::{migrate, KeyValueStore, StoreError};

/// Key the workspace snapshot lives under
pub const DEFAULT_STORE_KEY: &str = "lifedesk-workspace";

/// Read/write boundary between the workspace and its local store.
///
/// Saving is best effort and never fails from the caller's point of view;
/// loading always returns a complete, migrated workspace.
pub struct LocalCache<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> LocalCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist `state`, logging instead of failing. On failure the previously
    /// stored snapshot stays in place.
    pub fn save(&mut self, state: &WorkspaceState) {
        match self.try_save(state) {
            Ok(bytes) => tracing::debug!(key = %self.key, bytes, "Saved workspace"),
            Err(e) => tracing::warn!(key = %self.key, "Could not save workspace: {}", e),
        }
    }

    /// Persist `state` and report the stored size in bytes
    pub fn try_save(&mut self, state: &WorkspaceState) -> Result<usize, StoreError> {
        let encoded = encode_snapshot(state)?;
        self.store.set(&self.key, &encoded)?;
        Ok(encoded.len())
    }

    /// Load the stored workspace, migrated to the current shape. Missing,
    /// unreadable or corrupt records give the empty workspace.
    pub fn load(&self) -> WorkspaceState {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => migrate::restore(&raw),
            Ok(None) => {
                tracing::info!(key = %self.key, "No stored workspace; starting fresh");
                WorkspaceState::empty()
            }
            Err(e) => {
                tracing::warn!(key = %self.key, "Could not read stored workspace: {}", e);
                WorkspaceState::empty()
            }
        }
    }

    /// Raw stored record, as written
    pub fn raw(&self) -> Result<Option<String>, StoreError> {
        self.store.get(&self.key)
    }

    /// Forget the stored workspace. The next load starts fresh.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }
}
