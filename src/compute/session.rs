//! Generation/trial state machine for one participant session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

use super::archive::{NullSink, SessionSink};
use super::breeding::{OffspringBatch, generate_offspring};
use super::composite::create_composite;
use super::filter::filter_selection;
use super::selection::{SelectionPolicy, TrialContext};
use super::{EngineError, StimulusRng};
use crate::schema::{
    CANDIDATES_PER_TRIAL, ExperimentConfig, GenerationSummary, SessionPhase, SessionProgress,
    SessionResult, StimulusArray, TrialRecord,
};

/// Presentation layer. `present` blocks until the candidates are on screen
/// and may report an abort with [`EngineError::Cancelled`].
pub trait Presenter {
    fn present(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<(), EngineError>;
}

impl<F> Presenter for F
where
    F: FnMut(&TrialContext, &[StimulusArray]) -> Result<(), EngineError>,
{
    fn present(
        &mut self,
        context: &TrialContext,
        candidates: &[StimulusArray],
    ) -> Result<(), EngineError> {
        self(context, candidates)
    }
}

/// Presenter that shows nothing.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _: &TrialContext, _: &[StimulusArray]) -> Result<(), EngineError> {
        Ok(())
    }
}

/// The generation currently open.
struct GenerationState {
    index: usize,
    /// Offspring bred for this generation; empty for generation 0.
    batches: Vec<OffspringBatch>,
    /// Next batch to hand out. Only advances when a trial commits.
    next_batch: usize,
    /// Raw selections, for the generation composite.
    selections: Vec<StimulusArray>,
}

/// One participant's run through every generation.
pub struct Session {
    config: ExperimentConfig,
    rng: StimulusRng,
    policy: Box<dyn SelectionPolicy>,
    presenter: Box<dyn Presenter>,
    sink: Box<dyn SessionSink>,
    phase: SessionPhase,
    current: Option<GenerationState>,
    /// Filtered selections of the open generation; becomes the next
    /// generation's parent pool.
    next_parents: Vec<StimulusArray>,
    summaries: Vec<GenerationSummary>,
    trials: Vec<TrialRecord>,
    session_composite: Option<StimulusArray>,
    cancelled: Arc<AtomicBool>,
}

impl Session {
    /// Create a session. The policy is fixed for the session's lifetime.
    pub fn new(
        config: ExperimentConfig,
        policy: Box<dyn SelectionPolicy>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if config.exhausts_batches() {
            warn!(
                "{} trials per generation breed only {} batches; bred generations will run out",
                config.trials_per_generation,
                config.batches_per_generation()
            );
        }

        let rng = StimulusRng::from_option(config.random_seed);

        Ok(Self {
            config,
            rng,
            policy,
            presenter: Box::new(NullPresenter),
            sink: Box::new(NullSink),
            phase: SessionPhase::Idle,
            current: None,
            next_parents: Vec::new(),
            summaries: Vec::new(),
            trials: Vec::new(),
            session_composite: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Set the presentation layer.
    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    /// Set the persistence collaborator.
    pub fn with_sink(mut self, sink: impl SessionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Committed trials, in order.
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Summaries of completed generations.
    pub fn summaries(&self) -> &[GenerationSummary] {
        &self.summaries
    }

    /// Filtered selections collected so far in the open generation.
    pub fn parent_pool(&self) -> &[StimulusArray] {
        &self.next_parents
    }

    /// Get current progress.
    pub fn progress(&self) -> SessionProgress {
        let (generation, trials_completed) = match &self.current {
            Some(state) => (state.index, state.selections.len()),
            None => (0, 0),
        };
        SessionProgress {
            phase: self.phase,
            generation,
            total_generations: self.config.generations,
            trials_completed,
            trials_per_generation: self.config.trials_per_generation,
            total_trials_completed: self.trials.len(),
        }
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn abort(&mut self, err: &EngineError) {
        match err {
            EngineError::Cancelled => warn!("Session cancelled; in-flight trial discarded"),
            _ => error!("Session aborted: {}", err),
        }
        self.phase = SessionPhase::Aborted;
    }

    /// Open the next generation, breeding its offspring from the previous
    /// generation's filtered selections.
    fn open_next_generation(&mut self) -> Result<(), EngineError> {
        let index = self.current.as_ref().map_or(0, |state| state.index + 1);

        let batches = if index == 0 {
            Vec::new()
        } else {
            let parents = std::mem::take(&mut self.next_parents);
            let batches =
                generate_offspring(&mut self.rng, &parents, self.config.breeding.mutation_rate)?;
            if batches.len() < self.config.trials_per_generation {
                warn!(
                    "Generation {} has {} batches for {} trials",
                    index,
                    batches.len(),
                    self.config.trials_per_generation
                );
            }
            batches
        };

        info!(
            "Starting generation {}/{} ({} offspring batches)",
            index + 1,
            self.config.generations,
            batches.len()
        );

        self.current = Some(GenerationState {
            index,
            batches,
            next_batch: 0,
            selections: Vec::with_capacity(self.config.trials_per_generation),
        });
        self.next_parents.clear();
        self.phase = SessionPhase::GenerationInProgress { generation: index };
        Ok(())
    }

    /// Candidates for the next trial of the open generation.
    fn next_candidates(&mut self) -> Result<Vec<StimulusArray>, EngineError> {
        let size = self.config.stimulus_size;
        let state = self.current.as_ref().ok_or(EngineError::SessionFinished)?;

        if state.index == 0 {
            return Ok((0..CANDIDATES_PER_TRIAL)
                .map(|_| self.rng.generate_noise(size))
                .collect());
        }

        state
            .batches
            .get(state.next_batch)
            .cloned()
            .ok_or(EngineError::BatchExhausted {
                generation: state.index,
                requested: state.next_batch,
                available: state.batches.len(),
            })
    }

    /// Run one trial, opening a generation first if none is open.
    ///
    /// On any error, including cancellation, nothing from the trial is kept
    /// and the session moves to [`SessionPhase::Aborted`].
    pub fn run_trial(&mut self) -> Result<TrialRecord, EngineError> {
        if self.phase.is_terminal() {
            return Err(EngineError::SessionFinished);
        }
        match self.step_trial() {
            Ok(record) => Ok(record),
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    fn step_trial(&mut self) -> Result<TrialRecord, EngineError> {
        self.check_cancelled()?;
        if matches!(
            self.phase,
            SessionPhase::Idle | SessionPhase::GenerationComplete { .. }
        ) {
            self.open_next_generation()?;
        }

        let (generation, trial) = match &self.current {
            Some(state) => (state.index, state.selections.len()),
            None => return Err(EngineError::SessionFinished),
        };
        let context = TrialContext { generation, trial };
        self.phase = SessionPhase::TrialInProgress { generation, trial };

        let candidates = self.next_candidates()?;
        self.presenter.present(&context, &candidates)?;
        self.check_cancelled()?;

        let selection = self.policy.select(&context, &candidates)?;
        if selection.index >= candidates.len() {
            return Err(EngineError::InvalidSelection {
                index: selection.index,
                candidates: candidates.len(),
            });
        }
        self.check_cancelled()?;

        let mut rejected = candidates;
        let selected = rejected.remove(selection.index);
        let filtered = filter_selection(&selected, &rejected, &self.config.filter)?;

        let record = TrialRecord {
            generation,
            trial,
            selected_index: selection.index,
            reaction_time: selection.reaction_time.as_secs_f64(),
            mode: self.policy.mode(),
            selected,
            filtered,
        };
        self.commit(&record);
        debug!(
            "Generation {} trial {}: picked {} after {:.3}s",
            generation, trial, record.selected_index, record.reaction_time
        );

        self.sink.record_trial(&record)?;
        self.phase = SessionPhase::GenerationInProgress { generation };

        let done = self
            .current
            .as_ref()
            .is_some_and(|state| state.selections.len() >= self.config.trials_per_generation);
        if done {
            self.finish_generation()?;
        }
        Ok(record)
    }

    fn commit(&mut self, record: &TrialRecord) {
        if let Some(state) = self.current.as_mut() {
            if state.index > 0 {
                state.next_batch += 1;
            }
            state.selections.push(record.selected.clone());
        }
        self.next_parents.push(record.filtered.clone());
        self.trials.push(record.clone());
    }

    fn finish_generation(&mut self) -> Result<(), EngineError> {
        let Some(state) = self.current.as_ref() else {
            return Err(EngineError::SessionFinished);
        };
        let composite = create_composite(&state.selections)?;
        let summary = GenerationSummary {
            generation: state.index,
            selections: state.selections.len(),
            batches_available: state.batches.len(),
            composite,
        };
        let generation = summary.generation;
        info!(
            "Generation {} complete: {} selections averaged",
            generation, summary.selections
        );

        self.sink
            .record_composite(&summary.composite, Some(generation))?;
        self.summaries.push(summary);
        self.phase = SessionPhase::GenerationComplete { generation };

        if generation + 1 >= self.config.generations {
            self.finish_session()?;
        }
        Ok(())
    }

    fn finish_session(&mut self) -> Result<(), EngineError> {
        let selections: Vec<StimulusArray> =
            self.trials.iter().map(|t| t.selected.clone()).collect();
        let composite = create_composite(&selections)?;
        self.sink.record_composite(&composite, None)?;
        self.session_composite = Some(composite);
        self.phase = SessionPhase::SessionComplete;
        info!(
            "Session complete: {} generations, {} trials",
            self.summaries.len(),
            self.trials.len()
        );
        Ok(())
    }

    /// Run trials until the open (or next) generation completes.
    pub fn run_generation(&mut self) -> Result<GenerationSummary, EngineError> {
        loop {
            self.run_trial()?;
            if matches!(
                self.phase,
                SessionPhase::GenerationComplete { .. } | SessionPhase::SessionComplete
            ) {
                break;
            }
        }
        self.summaries
            .last()
            .cloned()
            .ok_or(EngineError::SessionFinished)
    }

    /// Results so far, once the session has completed.
    pub fn result(&self) -> Option<SessionResult> {
        let session_composite = self.session_composite.clone()?;
        Some(SessionResult {
            generations: self.summaries.clone(),
            session_composite,
            trials: self.trials.clone(),
        })
    }

    /// Run every remaining trial with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<SessionResult, EngineError>
    where
        F: FnMut(&SessionProgress),
    {
        while !self.phase.is_terminal() {
            self.run_trial()?;
            callback(&self.progress());
        }
        self.result().ok_or(EngineError::SessionFinished)
    }

    /// Run every remaining trial (blocking).
    pub fn run(&mut self) -> Result<SessionResult, EngineError> {
        self.run_with_callback(|_| {})
    }
}
