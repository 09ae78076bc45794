//! Configuration types for a reverse-correlation session.

use serde::{Deserialize, Serialize};

use super::DEFAULT_STIMULUS_SIZE;

/// Number of candidates shown on every trial, and the size of every
/// offspring batch.
pub const CANDIDATES_PER_TRIAL: usize = 12;

/// Top-level experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of generations in a session.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Trials per generation. Each trial consumes one offspring batch.
    #[serde(default = "default_trials_per_generation")]
    pub trials_per_generation: usize,
    /// Side length of every stimulus in cells.
    #[serde(default = "default_stimulus_size")]
    pub stimulus_size: usize,
    /// Crossbreeding parameters.
    #[serde(default)]
    pub breeding: BreedingConfig,
    /// Filter applied to each selected stimulus.
    #[serde(default)]
    pub filter: FilterConfig,
    /// How candidates are chosen.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Random seed for reproducible sessions. `None` draws from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            generations: default_generations(),
            trials_per_generation: default_trials_per_generation(),
            stimulus_size: default_stimulus_size(),
            breeding: BreedingConfig::default(),
            filter: FilterConfig::default(),
            selection: SelectionConfig::default(),
            random_seed: None,
        }
    }
}

fn default_generations() -> usize {
    12
}
fn default_trials_per_generation() -> usize {
    12
}
fn default_stimulus_size() -> usize {
    DEFAULT_STIMULUS_SIZE
}

/// Crossbreeding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedingConfig {
    /// Per-cell probability of replacing the inherited value with fresh noise.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for BreedingConfig {
    fn default() -> Self {
        Self {
            mutation_rate: default_mutation_rate(),
        }
    }
}

fn default_mutation_rate() -> f64 {
    0.01
}

/// Signal-preserving filter parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Absolute difference from the rejected mean above which a cell counts
    /// as signal.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Damping applied to signal cells.
    #[serde(default = "default_preservation_factor")]
    pub preservation_factor: f64,
    /// Fraction of the difference removed from noise cells.
    #[serde(default = "default_noise_reduction_factor")]
    pub noise_reduction_factor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            preservation_factor: default_preservation_factor(),
            noise_reduction_factor: default_noise_reduction_factor(),
        }
    }
}

fn default_threshold() -> f64 {
    30.0
}
fn default_preservation_factor() -> f64 {
    0.95
}
fn default_noise_reduction_factor() -> f64 {
    0.1
}

/// Selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// A participant picks through the presentation layer.
    #[default]
    Interactive,
    /// The candidate closest to the target is picked automatically.
    IdealObserver,
}

/// Selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub mode: SelectionMode,
    /// Reaction time reported by the ideal observer, in seconds.
    #[serde(default = "default_simulated_reaction_time")]
    pub simulated_reaction_time: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            simulated_reaction_time: default_simulated_reaction_time(),
        }
    }
}

fn default_simulated_reaction_time() -> f64 {
    0.5
}

impl ExperimentConfig {
    /// Offspring batches bred from one full generation of selections.
    ///
    /// Breeding `k` parents yields `k * k` children, cut into batches of
    /// [`CANDIDATES_PER_TRIAL`].
    #[inline]
    pub fn batches_per_generation(&self) -> usize {
        self.trials_per_generation
            .saturating_mul(self.trials_per_generation)
            / CANDIDATES_PER_TRIAL
    }

    /// Whether bred generations will run out of batches before their last
    /// trial.
    pub fn exhausts_batches(&self) -> bool {
        self.generations > 1 && self.batches_per_generation() < self.trials_per_generation
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generations == 0 {
            return Err(ConfigError::InvalidGenerations);
        }
        if self.trials_per_generation == 0 {
            return Err(ConfigError::InvalidTrials);
        }
        if self.stimulus_size == 0 {
            return Err(ConfigError::InvalidStimulusSize);
        }
        if !(0.0..=1.0).contains(&self.breeding.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate(self.breeding.mutation_rate));
        }
        let filter = &self.filter;
        for (name, value) in [
            ("threshold", filter.threshold),
            ("preservation_factor", filter.preservation_factor),
            ("noise_reduction_factor", filter.noise_reduction_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidFilterParameter { name, value });
            }
        }
        let rt = self.selection.simulated_reaction_time;
        if !rt.is_finite() || rt < 0.0 {
            return Err(ConfigError::InvalidReactionTime(rt));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Generation count must be non-zero")]
    InvalidGenerations,
    #[error("Trials per generation must be non-zero")]
    InvalidTrials,
    #[error("Stimulus size must be non-zero")]
    InvalidStimulusSize,
    #[error("Mutation rate {0} is outside [0, 1]")]
    InvalidMutationRate(f64),
    #[error("Filter parameter {name} must be finite and non-negative, got {value}")]
    InvalidFilterParameter { name: &'static str, value: f64 },
    #[error("Simulated reaction time must be finite and non-negative, got {0}")]
    InvalidReactionTime(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generations, 12);
        assert_eq!(config.trials_per_generation, 12);
        assert_eq!(config.stimulus_size, 16);
        assert_eq!(config.selection.mode, SelectionMode::Interactive);
        assert!(!config.exhausts_batches());
    }

    #[test]
    fn test_batches_per_generation() {
        let mut config = ExperimentConfig::default();
        assert_eq!(config.batches_per_generation(), 12);

        config.trials_per_generation = 6;
        assert_eq!(config.batches_per_generation(), 3);
        assert!(config.exhausts_batches());

        config.generations = 1;
        assert!(!config.exhausts_batches());
    }

    #[test]
    fn test_huge_trial_count_saturates() {
        let config: ExperimentConfig =
            serde_json::from_str(&format!(r#"{{"trials_per_generation": {}}}"#, usize::MAX))
                .unwrap();
        assert_eq!(
            config.batches_per_generation(),
            usize::MAX / CANDIDATES_PER_TRIAL
        );
        assert!(config.exhausts_batches());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ExperimentConfig {
            stimulus_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStimulusSize)
        ));

        let config = ExperimentConfig {
            breeding: BreedingConfig { mutation_rate: 1.5 },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMutationRate(_))
        ));

        let config = ExperimentConfig {
            filter: FilterConfig {
                threshold: -1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFilterParameter {
                name: "threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"generations": 3, "selection": {"mode": "ideal_observer"}}"#)
                .unwrap();
        assert_eq!(config.generations, 3);
        assert_eq!(config.trials_per_generation, 12);
        assert_eq!(config.selection.mode, SelectionMode::IdealObserver);
        assert!((config.selection.simulated_reaction_time - 0.5).abs() < 1e-12);
        assert!((config.filter.threshold - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_serialization() {
        let config = ExperimentConfig {
            random_seed: Some(7),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.random_seed, Some(7));
        assert_eq!(parsed.generations, config.generations);
    }
}
