//! Signal-preserving filter applied to each selected stimulus.
//!
//! Cells that differ strongly from the mean of the rejected candidates are
//! treated as the features that made the participant pick this stimulus and
//! are kept with slight damping. All other cells are pulled towards the
//! rejected mean, which damps noise shared by every candidate.

use super::EngineError;
use crate::schema::{FilterConfig, StimulusArray, quantize};

/// Elementwise mean of a non-empty set of equally shaped grids.
pub(crate) fn mean_grid(grids: &[StimulusArray]) -> Result<Vec<f64>, EngineError> {
    let first = grids.first().ok_or(EngineError::EmptyNonSelectedSet)?;
    let mut sum = vec![0.0f64; first.len()];
    for grid in grids {
        EngineError::check_shape(first.shape(), grid.shape())?;
        for (acc, &v) in sum.iter_mut().zip(grid.as_slice()) {
            *acc += v as f64;
        }
    }
    let count = grids.len() as f64;
    sum.iter_mut().for_each(|v| *v /= count);
    Ok(sum)
}

/// Filter `selected` against the candidates that were not chosen.
pub fn filter_selection(
    selected: &StimulusArray,
    non_selected: &[StimulusArray],
    params: &FilterConfig,
) -> Result<StimulusArray, EngineError> {
    if non_selected.is_empty() {
        return Err(EngineError::EmptyNonSelectedSet);
    }
    EngineError::check_shape(selected.shape(), non_selected[0].shape())?;
    let rejected_mean = mean_grid(non_selected)?;

    let data = selected
        .as_slice()
        .iter()
        .zip(&rejected_mean)
        .map(|(&value, &mean)| filter_cell(value as f64, mean, params))
        .collect();

    Ok(StimulusArray::from_cells(
        selected.width(),
        selected.height(),
        data,
    ))
}

#[inline]
fn filter_cell(value: f64, rejected_mean: f64, params: &FilterConfig) -> u8 {
    let difference = value - rejected_mean;
    if difference.abs() > params.threshold {
        quantize(value * params.preservation_factor)
    } else {
        quantize(value - params.noise_reduction_factor * difference)
    }
}
