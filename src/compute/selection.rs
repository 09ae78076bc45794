//! Selection policies: who picks one of the candidates on each trial.

use std::time::Duration;

use super::EngineError;
use crate::schema::{
    CANDIDATES_PER_TRIAL, ConfigError, SelectionConfig, SelectionMode, StimulusArray,
};

/// Position of a trial within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialContext {
    pub generation: usize,
    pub trial: usize,
}

/// A chosen candidate and how long the choice took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub reaction_time: Duration,
}

/// Chooses one candidate per trial.
///
/// Picked once when a session is built; the session never switches policy.
pub trait SelectionPolicy {
    /// Mode recorded alongside each trial.
    fn mode(&self) -> SelectionMode;

    /// Choose one of `candidates`. May block on external input and may
    /// return [`EngineError::Cancelled`].
    fn select(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<Selection, EngineError>;
}

/// External source of participant responses (pointer tracking, hit-testing
/// and timing all live on the other side of this trait).
pub trait ResponseSource {
    fn await_response(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<Selection, EngineError>;
}

impl<F> ResponseSource for F
where
    F: FnMut(&TrialContext, &[StimulusArray]) -> Result<Selection, EngineError>,
{
    fn await_response(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<Selection, EngineError> {
        self(context, candidates)
    }
}

/// Participant-driven selection.
pub struct InteractiveSelection {
    responder: Box<dyn ResponseSource>,
}

impl InteractiveSelection {
    pub fn new(responder: Box<dyn ResponseSource>) -> Self {
        Self { responder }
    }
}

impl SelectionPolicy for InteractiveSelection {
    fn mode(&self) -> SelectionMode {
        SelectionMode::Interactive
    }

    fn select(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<Selection, EngineError> {
        let selection = self.responder.await_response(context, candidates)?;
        if selection.index >= candidates.len() {
            return Err(EngineError::InvalidSelection {
                index: selection.index,
                candidates: candidates.len(),
            });
        }
        Ok(selection)
    }
}

/// Automated observer that always picks the candidate closest to a known
/// target.
pub struct IdealObserverSelection {
    target: Option<StimulusArray>,
    reaction_time: Duration,
}

impl IdealObserverSelection {
    /// `reaction_time` is reported with every pick.
    pub fn new(target: Option<StimulusArray>, reaction_time: Duration) -> Self {
        Self {
            target,
            reaction_time,
        }
    }
}

impl SelectionPolicy for IdealObserverSelection {
    fn mode(&self) -> SelectionMode {
        SelectionMode::IdealObserver
    }

    fn select(
        &mut self,
        _context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<Selection, EngineError> {
        let target = self.target.as_ref().ok_or(EngineError::TargetMissing)?;
        Ok(Selection {
            index: ideal_observer_select(candidates, target)?,
            reaction_time: self.reaction_time,
        })
    }
}

/// Sum of squared cell differences.
pub fn squared_distance(a: &StimulusArray, b: &StimulusArray) -> Result<u64, EngineError> {
    EngineError::check_shape(a.shape(), b.shape())?;
    Ok(a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(&x, &y)| {
            let d = x as i64 - y as i64;
            (d * d) as u64
        })
        .sum())
}

/// Index of the candidate with the smallest squared distance to `target`.
///
/// The target is resized (nearest neighbour) to the candidates' shape first.
/// Ties go to the lowest index.
pub fn ideal_observer_select(
    candidates: &[StimulusArray],
    target: &StimulusArray,
) -> Result<usize, EngineError> {
    let first = candidates.first().ok_or(EngineError::CandidateCount {
        expected: CANDIDATES_PER_TRIAL,
        found: 0,
    })?;
    if target.is_empty() && !first.is_empty() {
        return Err(EngineError::ShapeMismatch {
            expected: first.shape(),
            found: target.shape(),
        });
    }
    let target = target.resize_nearest(first.width(), first.height());

    let mut best: Option<(usize, u64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let distance = squared_distance(candidate, &target)?;
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }
    Ok(best.map_or(0, |(index, _)| index))
}

/// Build the policy for `config.mode`.
///
/// Ideal-observer mode requires `target`; interactive mode requires
/// `responder`.
pub fn build_policy(
    config: &SelectionConfig,
    target: Option<StimulusArray>,
    responder: Option<Box<dyn ResponseSource>>,
) -> Result<Box<dyn SelectionPolicy>, EngineError> {
    match config.mode {
        SelectionMode::Interactive => {
            let responder = responder.ok_or(EngineError::ResponderMissing)?;
            Ok(Box::new(InteractiveSelection::new(responder)))
        }
        SelectionMode::IdealObserver => {
            let target = target.ok_or(EngineError::TargetMissing)?;
            let rt = config.simulated_reaction_time;
            let reaction_time = Duration::try_from_secs_f64(rt)
                .map_err(|_| ConfigError::InvalidReactionTime(rt))?;
            Ok(Box::new(IdealObserverSelection::new(
                Some(target),
                reaction_time,
            )))
        }
    }
}
