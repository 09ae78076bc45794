//! Schema module - Grids, configuration and record types for a session.

mod config;
mod session;
mod stimulus;
mod target;

pub use config::*;
pub use session::*;
pub use stimulus::*;
pub use target::*;
