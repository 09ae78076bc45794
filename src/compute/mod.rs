//! Compute module - Breeding, filtering, selection and the session loop.

mod archive;
mod breeding;
mod composite;
mod error;
mod filter;
mod rng;
mod selection;
mod session;
mod training;

pub use archive::*;
pub use breeding::*;
pub use composite::*;
pub use error::*;
pub use filter::filter_selection;
pub use rng::*;
pub use selection::*;
pub use session::*;
pub use training::*;
