//! Persistence of selections and composites.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::EngineError;
use crate::schema::{StimulusArray, TrialRecord};

/// Receives committed trials and composites. Nothing reaches a sink until
/// the trial that produced it has committed.
pub trait SessionSink {
    /// Store the raw and filtered selection of one trial.
    fn record_trial(&mut self, record: &TrialRecord) -> Result<(), EngineError>;

    /// Store a composite; `generation` is `None` for the session composite.
    fn record_composite(
        &mut self,
        composite: &StimulusArray,
        generation: Option<usize>,
    ) -> Result<(), EngineError>;
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl SessionSink for NullSink {
    fn record_trial(&mut self, _record: &TrialRecord) -> Result<(), EngineError> {
        Ok(())
    }

    fn record_composite(
        &mut self,
        _composite: &StimulusArray,
        _generation: Option<usize>,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub trials: Vec<TrialRecord>,
    pub composites: Vec<(Option<usize>, StimulusArray)>,
}

impl SessionSink for MemorySink {
    fn record_trial(&mut self, record: &TrialRecord) -> Result<(), EngineError> {
        self.trials.push(record.clone());
        Ok(())
    }

    fn record_composite(
        &mut self,
        composite: &StimulusArray,
        generation: Option<usize>,
    ) -> Result<(), EngineError> {
        self.composites.push((generation, composite.clone()));
        Ok(())
    }
}

/// Shared sink, so a caller can inspect what the session wrote.
impl<S: SessionSink> SessionSink for Rc<RefCell<S>> {
    fn record_trial(&mut self, record: &TrialRecord) -> Result<(), EngineError> {
        self.borrow_mut().record_trial(record)
    }

    fn record_composite(
        &mut self,
        composite: &StimulusArray,
        generation: Option<usize>,
    ) -> Result<(), EngineError> {
        self.borrow_mut().record_composite(composite, generation)
    }
}

/// Exported composite format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeExport {
    /// Participant the session belongs to.
    pub participant: String,
    /// Generation index, or `None` for the whole session.
    pub generation: Option<usize>,
    pub composite: StimulusArray,
}

/// Exported selection format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionExport {
    pub participant: String,
    #[serde(flatten)]
    pub record: TrialRecord,
}

/// Archive that writes one JSON file per selection and composite.
#[derive(Debug)]
pub struct SessionArchive {
    participant: String,
    output_dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl SessionArchive {
    /// Create the archive, creating `dir` if needed.
    pub fn new<P: AsRef<Path>>(dir: P, participant: impl Into<String>) -> io::Result<Self> {
        let output_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            participant: participant.into(),
            output_dir,
            saved: Vec::new(),
        })
    }

    /// Files written so far, in order.
    pub fn saved_paths(&self) -> &[PathBuf] {
        &self.saved
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_json<T: Serialize>(&mut self, filename: String, value: &T) -> io::Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        self.saved.push(path.clone());
        Ok(path)
    }
}

impl SessionSink for SessionArchive {
    fn record_trial(&mut self, record: &TrialRecord) -> Result<(), EngineError> {
        let filename = format!(
            "selection_p{}_g{}_t{}.json",
            self.participant, record.generation, record.trial
        );
        let export = SelectionExport {
            participant: self.participant.clone(),
            record: record.clone(),
        };
        self.write_json(filename, &export)
            .map(|_| ())
            .map_err(|e| EngineError::Sink(e.to_string()))
    }

    fn record_composite(
        &mut self,
        composite: &StimulusArray,
        generation: Option<usize>,
    ) -> Result<(), EngineError> {
        let filename = match generation {
            Some(g) => format!("composite_p{}_g{}.json", self.participant, g),
            None => format!("composite_p{}_all.json", self.participant),
        };
        let export = CompositeExport {
            participant: self.participant.clone(),
            generation,
            composite: composite.clone(),
        };
        self.write_json(filename, &export)
            .map(|_| ())
            .map_err(|e| EngineError::Sink(e.to_string()))
    }
}

/// Load a composite written by [`SessionArchive`].
pub fn load_composite<P: AsRef<Path>>(path: P) -> io::Result<CompositeExport> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Load a selection written by [`SessionArchive`].
pub fn load_selection<P: AsRef<Path>>(path: P) -> io::Result<SelectionExport> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
