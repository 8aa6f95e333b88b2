use std::time::Duration;

use lifedesk_shared::WorkspaceState;

use crate::{
    ensure_welcome_page, spawn_autosave, Action, AutosaveHandle, KeyValueStore, LocalCache,
    Outcome, Persistence, Workspace, WorkspaceError,
};

/// A running workspace: the in-memory state plus the task persisting it.
pub struct Session<S> {
    workspace: Workspace,
    autosave: AutosaveHandle<S>,
}

impl<S> Session<S>
where
    S: KeyValueStore + Send + 'static,
{
    /// Load the stored workspace, add the welcome page on first run and start
    /// auto-saving. Must be called from within a tokio runtime.
    pub fn open(mut cache: LocalCache<S>, delay: Duration, app_name: &str) -> Self {
        let mut workspace = Workspace::new(cache.load());

        match ensure_welcome_page(&mut workspace, app_name) {
            Ok(Some(_)) => cache.save(workspace.state()),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not create welcome page: {}", e),
        }

        Self {
            workspace,
            autosave: spawn_autosave(cache, delay),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn state(&self) -> &WorkspaceState {
        self.workspace.state()
    }

    /// Apply `action` and hand the new state to the auto-save task. A failed
    /// action changes nothing and persists nothing.
    pub fn apply(&mut self, action: Action) -> Result<Outcome, WorkspaceError> {
        let persistence = action.persistence();
        let outcome = self.workspace.dispatch(action)?;

        let snapshot = self.workspace.state().clone();
        match persistence {
            Persistence::Immediate => self.autosave.save_now(snapshot),
            Persistence::Debounced => self.autosave.edit(snapshot),
        }
        Ok(outcome)
    }

    /// Drop edits still waiting for the auto-save delay
    pub fn discard_pending(&self) {
        self.autosave.cancel();
    }

    pub fn flush(&self) {
        self.autosave.flush();
    }

    /// Persist anything pending and return the cache
    pub async fn close(self) -> Option<LocalCache<S>> {
        self.autosave.shutdown().await
    }
}
