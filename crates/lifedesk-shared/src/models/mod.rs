mod block;
mod calendar;
mod finance;
mod health;
mod page;
mod task;
mod workspace;

pub use block::*;
pub use calendar::*;
pub use finance::*;
pub use health::*;
pub use page::*;
pub use task::*;
pub use workspace::*;
