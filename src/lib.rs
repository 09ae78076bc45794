//! Genetic reverse correlation - Evolving noise stimuli towards a mental
//! template.
//!
//! A session runs over several generations. Each trial shows twelve noise
//! images, one is selected (by a participant or by an ideal observer that
//! knows the target), and the selection is filtered against the rejected
//! candidates. The filtered selections of a generation are bred into the
//! next generation's candidates by per-cell crossover with mutation, and
//! the raw selections are averaged into composite images.
//!
//! # Architecture
//!
//! - `schema`: Grids, targets, configuration and the records a session
//!   produces
//! - `compute`: Breeding, filtering, selection policies, composites,
//!   persistence and the [`Session`](compute::Session) state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use genetic_revcorr::{
//!     compute::{Session, build_policy},
//!     schema::{ExperimentConfig, SelectionMode, Target},
//! };
//!
//! let mut config = ExperimentConfig::default();
//! config.selection.mode = SelectionMode::IdealObserver;
//! config.random_seed = Some(7);
//!
//! let target = Target::letter('S', 16, 96).expect("built-in glyph");
//! let policy = build_policy(&config.selection, Some(target.array), None)?;
//!
//! let mut session = Session::new(config, policy)?;
//! let result = session.run()?;
//!
//! println!("{} trials, composite {:?}", result.trials.len(), result.session_composite.shape());
//! # Ok::<(), genetic_revcorr::compute::EngineError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{EngineError, Session, SessionArchive, StimulusRng};
pub use schema::{ExperimentConfig, SelectionMode, StimulusArray, Target};
