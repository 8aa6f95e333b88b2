//! Local persistence for the LifeDesk workspace.
//!
//! The flow on save is `Workspace` → [`serializer`] (strips embedded media) →
//! [`KeyValueStore`]. On load the raw record goes through [`migrate`], which
//! backfills anything an older version did not write, and comes back as a
//! fully valid [`WorkspaceState`](lifedesk_shared::WorkspaceState).

mod autosave;
mod backend;
mod bootstrap;
mod cache;
mod error;
pub mod migrate;
pub mod serializer;
mod session;
mod tree;
mod workspace;

pub use autosave::{spawn_autosave, AutosaveHandle, DEFAULT_AUTOSAVE_DELAY};
pub use backend::{FileStore, KeyValueStore, MemoryStore, DEFAULT_QUOTA_BYTES};
pub use bootstrap::ensure_welcome_page;
pub use cache::{LocalCache, DEFAULT_STORE_KEY};
pub use error::{StoreError, WorkspaceError};
pub use session::Session;
pub use tree::reconcile_tree;
pub use workspace::{Action, Outcome, Persistence, Workspace};
