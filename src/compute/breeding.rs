//! Crossbreeding of selected stimuli into offspring batches.

use log::{debug, warn};

use super::{EngineError, StimulusRng};
use crate::schema::{CANDIDATES_PER_TRIAL, StimulusArray};

/// Exactly [`CANDIDATES_PER_TRIAL`] stimuli shown together on one trial.
pub type OffspringBatch = Vec<StimulusArray>;

/// Uniform crossover with per-cell mutation.
///
/// Every cell independently takes `parent_a`'s or `parent_b`'s value with
/// equal probability, then with probability `mutation_rate` is replaced by a
/// fresh uniform intensity.
pub fn crossbreed(
    rng: &mut StimulusRng,
    parent_a: &StimulusArray,
    parent_b: &StimulusArray,
    mutation_rate: f64,
) -> Result<StimulusArray, EngineError> {
    parent_a
        .zip_with(parent_b, |a, b| {
            let inherited = if rng.coin() { a } else { b };
            if rng.chance(mutation_rate) {
                rng.intensity()
            } else {
                inherited
            }
        })
        .ok_or(EngineError::ShapeMismatch {
            expected: parent_a.shape(),
            found: parent_b.shape(),
        })
}

/// Breed every ordered pair of parents (self-pairs included) and cut the
/// shuffled children into batches of [`CANDIDATES_PER_TRIAL`].
///
/// `k` parents give `k * k` children and `floor(k * k / 12)` batches; the
/// trailing `k * k mod 12` children are dropped.
pub fn generate_offspring(
    rng: &mut StimulusRng,
    parents: &[StimulusArray],
    mutation_rate: f64,
) -> Result<Vec<OffspringBatch>, EngineError> {
    if parents.len() < 2 {
        return Err(EngineError::InsufficientParents {
            count: parents.len(),
        });
    }

    let mut children = Vec::with_capacity(parents.len() * parents.len());
    for parent_a in parents {
        for parent_b in parents {
            children.push(crossbreed(rng, parent_a, parent_b, mutation_rate)?);
        }
    }

    rng.shuffle(&mut children);

    let dropped = children.len() % CANDIDATES_PER_TRIAL;
    if dropped > 0 {
        warn!(
            "Dropping {} of {} offspring that do not fill a batch of {}",
            dropped,
            children.len(),
            CANDIDATES_PER_TRIAL
        );
    }
    children.truncate(children.len() - dropped);

    let mut batches = Vec::with_capacity(children.len() / CANDIDATES_PER_TRIAL);
    let mut rest = children.into_iter();
    loop {
        let batch: OffspringBatch = rest.by_ref().take(CANDIDATES_PER_TRIAL).collect();
        if batch.is_empty() {
            break;
        }
        batches.push(batch);
    }

    debug!(
        "Bred {} parents into {} batches",
        parents.len(),
        batches.len()
    );
    Ok(batches)
}
