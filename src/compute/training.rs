//! Practice phase: find the one noise image with a fading letter blended in.

use log::info;

use super::selection::{SelectionPolicy, TrialContext};
use super::session::Presenter;
use super::{EngineError, StimulusRng};
use crate::schema::{BACKGROUND, CANDIDATES_PER_TRIAL, StimulusArray, TrainingRecord};

/// Practice trials run before a session.
pub const TRAINING_TRIALS: usize = 12;

/// Letter weight on the first practice trial.
const INITIAL_VISIBILITY: f64 = 1.9;
/// Weight lost per practice trial.
const VISIBILITY_STEP: f64 = 0.15;
/// Floor the weight never drops below.
const MIN_VISIBILITY: f64 = 0.15;

/// Letter weight for a 1-based practice trial number.
pub fn training_visibility(trial_number: usize) -> f64 {
    let elapsed = trial_number.saturating_sub(1) as f64;
    (INITIAL_VISIBILITY - elapsed * VISIBILITY_STEP).max(MIN_VISIBILITY)
}

/// Fresh noise, optionally with `letter` blended in.
///
/// Only letter cells (anything darker than the background) change:
/// `(1 - v) * noise + v * letter`, truncated and clipped, where `v` is
/// [`training_visibility`].
pub fn training_stimulus(
    rng: &mut StimulusRng,
    letter: &StimulusArray,
    has_target: bool,
    trial_number: usize,
) -> Result<StimulusArray, EngineError> {
    if !letter.is_square() {
        return Err(EngineError::ShapeMismatch {
            expected: (letter.width(), letter.width()),
            found: letter.shape(),
        });
    }
    let noise = rng.generate_noise(letter.width());
    if !has_target {
        return Ok(noise);
    }

    let visibility = training_visibility(trial_number);
    noise
        .zip_with(letter, |n, l| {
            if l < BACKGROUND {
                let blended = (1.0 - visibility) * n as f64 + visibility * l as f64;
                blended.trunc().clamp(0.0, 255.0) as u8
            } else {
                n
            }
        })
        .ok_or(EngineError::ShapeMismatch {
            expected: noise.shape(),
            found: letter.shape(),
        })
}

/// Candidates for one practice trial and the index of the one carrying
/// `letter`. Every other candidate is plain noise.
pub fn training_trial(
    rng: &mut StimulusRng,
    letter: &StimulusArray,
    trial_number: usize,
) -> Result<(Vec<StimulusArray>, usize), EngineError> {
    let target_index = rng.index(CANDIDATES_PER_TRIAL);
    let candidates = (0..CANDIDATES_PER_TRIAL)
        .map(|i| training_stimulus(rng, letter, i == target_index, trial_number))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((candidates, target_index))
}

/// Run `trials` practice trials through the usual presentation and
/// selection seams.
///
/// Contexts report generation 0 and the 0-based practice trial. Nothing
/// here touches breeding or the parent pool.
pub fn run_training(
    rng: &mut StimulusRng,
    letter: &StimulusArray,
    trials: usize,
    policy: &mut dyn SelectionPolicy,
    presenter: &mut dyn Presenter,
) -> Result<Vec<TrainingRecord>, EngineError> {
    let mut records = Vec::with_capacity(trials);
    for trial_number in 1..=trials {
        let (candidates, target_index) = training_trial(rng, letter, trial_number)?;
        let context = TrialContext {
            generation: 0,
            trial: trial_number - 1,
        };
        presenter.present(&context, &candidates)?;

        let selection = policy.select(&context, &candidates)?;
        if selection.index >= candidates.len() {
            return Err(EngineError::InvalidSelection {
                index: selection.index,
                candidates: candidates.len(),
            });
        }
        records.push(TrainingRecord::new(
            trial_number,
            target_index,
            selection.index,
            selection.reaction_time.as_secs_f64(),
        ));
    }

    info!(
        "Training done: {:.0}% correct over {} trials",
        training_accuracy(&records) * 100.0,
        records.len()
    );
    Ok(records)
}

/// Fraction of practice trials answered correctly (0 when there are none).
pub fn training_accuracy(records: &[TrainingRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().filter(|r| r.correct).count() as f64 / records.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{InteractiveSelection, NullPresenter, Selection};
    use crate::schema::{INK, render_glyph};
    use std::time::Duration;

    /// Candidates whose letter cells are all ink.
    fn dark_letter_candidates(
        letter: &StimulusArray,
        candidates: &[StimulusArray],
    ) -> Vec<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.as_slice()
                    .iter()
                    .zip(letter.as_slice())
                    .all(|(&v, &l)| l != INK || v == 0)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn pick(index: usize) -> InteractiveSelection {
        InteractiveSelection::new(Box::new(move |_: &TrialContext, _: &[StimulusArray]| {
            Ok::<_, EngineError>(Selection {
                index,
                reaction_time: Duration::from_millis(400),
            })
        }))
    }

    #[test]
    fn test_visibility_schedule() {
        assert!((training_visibility(1) - 1.9).abs() < 1e-12);
        assert!((training_visibility(2) - 1.75).abs() < 1e-12);
        assert!((training_visibility(12) - 0.25).abs() < 1e-9);
        assert!((training_visibility(40) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_without_target_is_plain_noise() {
        let letter = render_glyph('J', 16).unwrap();
        let a = training_stimulus(&mut StimulusRng::new(5), &letter, false, 1).unwrap();
        let b = StimulusRng::new(5).generate_noise(16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_background_cells_keep_noise() {
        let letter = render_glyph('J', 16).unwrap();
        let noise = StimulusRng::new(5).generate_noise(16);
        let blended = training_stimulus(&mut StimulusRng::new(5), &letter, true, 3).unwrap();

        for ((&b, &n), &l) in blended
            .as_slice()
            .iter()
            .zip(noise.as_slice())
            .zip(letter.as_slice())
        {
            if l == BACKGROUND {
                assert_eq!(b, n);
            }
        }
    }

    #[test]
    fn test_early_trials_show_dark_letter() {
        // With v >= 1 and black ink the blend is driven to zero
        let letter = render_glyph('J', 16).unwrap();
        let blended = training_stimulus(&mut StimulusRng::new(9), &letter, true, 1).unwrap();
        for (&b, &l) in blended.as_slice().iter().zip(letter.as_slice()) {
            if l == INK {
                assert_eq!(b, 0);
            }
        }
    }

    #[test]
    fn test_training_trial_hides_one_letter() {
        let letter = render_glyph('J', 16).unwrap();
        for seed in 0..10 {
            let mut rng = StimulusRng::new(seed);
            let (candidates, target_index) = training_trial(&mut rng, &letter, 1).unwrap();
            assert_eq!(candidates.len(), CANDIDATES_PER_TRIAL);
            assert!(candidates.iter().all(|c| c.shape() == (16, 16)));
            assert_eq!(dark_letter_candidates(&letter, &candidates), vec![target_index]);
        }
    }

    #[test]
    fn test_target_position_varies() {
        let letter = render_glyph('J', 16).unwrap();
        let positions: Vec<usize> = (0..40)
            .map(|seed| training_trial(&mut StimulusRng::new(seed), &letter, 1).unwrap().1)
            .collect();
        assert!(positions.iter().all(|&i| i < CANDIDATES_PER_TRIAL));
        assert!(positions.iter().any(|&i| i != positions[0]));
    }

    #[test]
    fn test_run_training_scores_choices() {
        let letter = render_glyph('J', 16).unwrap();
        let mut policy = pick(0);
        let records = run_training(
            &mut StimulusRng::new(8),
            &letter,
            TRAINING_TRIALS,
            &mut policy,
            &mut NullPresenter,
        )
        .unwrap();

        assert_eq!(records.len(), TRAINING_TRIALS);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.trial_number, i + 1);
            assert_eq!(record.selected_index, 0);
            assert_eq!(record.correct, record.target_index == 0);
            assert!((record.reaction_time - 0.4).abs() < 1e-9);
        }
    }

    #[test]
    fn test_picking_the_letter_is_correct() {
        let letter = render_glyph('J', 16).unwrap();
        let ink = letter.clone();
        // Visibility is about 1 or more for the first 7 trials, so letter
        // cells truncate to 0
        let responder = move |_: &TrialContext, c: &[StimulusArray]| {
            Ok::<_, EngineError>(Selection {
                index: dark_letter_candidates(&ink, c)[0],
                reaction_time: Duration::ZERO,
            })
        };
        let mut policy = InteractiveSelection::new(Box::new(responder));
        let records = run_training(
            &mut StimulusRng::new(21),
            &letter,
            7,
            &mut policy,
            &mut NullPresenter,
        )
        .unwrap();
        assert!(records.iter().all(|r| r.correct));
        assert_eq!(training_accuracy(&records), 1.0);
    }

    #[test]
    fn test_presenter_sees_every_trial() {
        let letter = render_glyph('J', 16).unwrap();
        let mut shown = Vec::new();
        let mut presenter = |ctx: &TrialContext, c: &[StimulusArray]| {
            shown.push((ctx.trial, c.len()));
            Ok::<_, EngineError>(())
        };
        let mut policy = pick(3);
        run_training(
            &mut StimulusRng::new(2),
            &letter,
            4,
            &mut policy,
            &mut presenter,
        )
        .unwrap();
        assert_eq!(shown, vec![(0, 12), (1, 12), (2, 12), (3, 12)]);
    }

    #[test]
    fn test_presenter_abort_stops_training() {
        let letter = render_glyph('J', 16).unwrap();
        let mut presenter = |ctx: &TrialContext, _: &[StimulusArray]| {
            if ctx.trial == 2 {
                Err(EngineError::Cancelled)
            } else {
                Ok(())
            }
        };
        let mut policy = pick(0);
        let result = run_training(
            &mut StimulusRng::new(2),
            &letter,
            TRAINING_TRIALS,
            &mut policy,
            &mut presenter,
        );
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn test_accuracy() {
        let records = [
            TrainingRecord::new(1, 3, 3, 0.5),
            TrainingRecord::new(2, 4, 1, 0.5),
            TrainingRecord::new(3, 0, 0, 0.5),
            TrainingRecord::new(4, 9, 2, 0.5),
        ];
        assert!(records[0].correct && !records[1].correct);
        assert_eq!(training_accuracy(&records), 0.5);
        assert_eq!(training_accuracy(&[]), 0.0);
    }

    #[test]
    fn test_non_square_letter_rejected() {
        let letter = StimulusArray::from_vec(2, 3, vec![0; 6]).unwrap();
        assert!(matches!(
            training_stimulus(&mut StimulusRng::new(1), &letter, true, 1),
            Err(EngineError::ShapeMismatch { .. })
        ));
    }
}
