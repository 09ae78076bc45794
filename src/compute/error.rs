//! Errors raised by the stimulus engine.

use crate::schema::{ConfigError, Shape};

/// Fatal conditions of breeding, filtering, selection and orchestration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Breeding needs at least 2 parents, got {count}")]
    InsufficientParents { count: usize },
    #[error("Filtering needs at least one rejected candidate")]
    EmptyNonSelectedSet,
    #[error(
        "Generation {generation} requested offspring batch {requested} but only {available} were bred"
    )]
    BatchExhausted {
        generation: usize,
        requested: usize,
        available: usize,
    },
    #[error("Ideal observer selection requires a target")]
    TargetMissing,
    #[error("Interactive selection requires a response source")]
    ResponderMissing,
    #[error("Grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Shape, found: Shape },
    #[error("Expected {expected} candidates, found {found}")]
    CandidateCount { expected: usize, found: usize },
    #[error("Selected index {index} is out of range for {candidates} candidates")]
    InvalidSelection { index: usize, candidates: usize },
    #[error("Session cancelled")]
    Cancelled,
    #[error("Session has already finished")]
    SessionFinished,
    #[error("Persistence failed: {0}")]
    Sink(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Check that `found` has the same shape as `expected`.
    pub(crate) fn check_shape(expected: Shape, found: Shape) -> Result<(), EngineError> {
        if expected == found {
            Ok(())
        } else {
            Err(EngineError::ShapeMismatch { expected, found })
        }
    }
}
