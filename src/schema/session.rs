//! Records produced while a session runs.

use serde::{Deserialize, Serialize};

use super::{SelectionMode, StimulusArray};

/// Outcome of one committed trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Generation index (0-based).
    pub generation: usize,
    /// Trial index within the generation (0-based).
    pub trial: usize,
    /// Index of the chosen candidate.
    pub selected_index: usize,
    /// Reaction time in seconds.
    pub reaction_time: f64,
    /// How the choice was made.
    pub mode: SelectionMode,
    /// The chosen candidate as shown.
    pub selected: StimulusArray,
    /// The chosen candidate after filtering; feeds the next generation.
    pub filtered: StimulusArray,
}

/// Outcome of one practice trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Practice trial number (1-based).
    pub trial_number: usize,
    /// Position of the candidate carrying the letter.
    pub target_index: usize,
    pub selected_index: usize,
    /// Whether the letter candidate was picked.
    pub correct: bool,
    /// Reaction time in seconds.
    pub reaction_time: f64,
}

impl TrainingRecord {
    pub fn new(
        trial_number: usize,
        target_index: usize,
        selected_index: usize,
        reaction_time: f64,
    ) -> Self {
        Self {
            trial_number,
            target_index,
            selected_index,
            correct: selected_index == target_index,
            reaction_time,
        }
    }
}

/// Composite of one completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    /// Number of selections averaged into the composite.
    pub selections: usize,
    /// Offspring batches bred for this generation (0 for generation 0).
    pub batches_available: usize,
    pub composite: StimulusArray,
}

/// Final output of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    /// One summary per generation, in order.
    pub generations: Vec<GenerationSummary>,
    /// Composite over every selection of every generation.
    pub session_composite: StimulusArray,
    /// Every committed trial, in order.
    pub trials: Vec<TrialRecord>,
}

/// State of the generation/trial state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Nothing has run yet.
    Idle,
    /// A generation is open and waiting for its next trial.
    GenerationInProgress { generation: usize },
    /// A trial is being presented and answered.
    TrialInProgress { generation: usize, trial: usize },
    /// All trials of a generation ran and its composite exists.
    GenerationComplete { generation: usize },
    /// Every generation ran and the session composite exists.
    SessionComplete,
    /// Cancelled or failed; nothing further will run.
    Aborted,
}

impl SessionPhase {
    /// Whether no further trials can run.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::SessionComplete | SessionPhase::Aborted)
    }
}

/// Progress snapshot for callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    /// Current (or last) generation index.
    pub generation: usize,
    pub total_generations: usize,
    /// Trials committed in the current generation.
    pub trials_completed: usize,
    pub trials_per_generation: usize,
    /// Trials committed over the whole session.
    pub total_trials_completed: usize,
}
