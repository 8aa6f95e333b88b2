//! Entity model shared by every LifeDesk crate.
//!
//! Everything here is plain data: the persisted shapes of the workspace, the
//! defaults used when a field is missing, and the factories that create new
//! entities. Persistence and migration live in `lifedesk-store`.

mod error;
mod ids;
pub mod models;

pub use error::ModelError;
pub use ids::{generate_id, now_millis};
pub use models::*;
