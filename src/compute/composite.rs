//! Pixel-wise averaging of selections into a composite image.

use log::warn;

use super::EngineError;
use super::filter::mean_grid;
use crate::schema::{DEFAULT_STIMULUS_SIZE, StimulusArray, quantize};

/// Elementwise mean of `arrays`, rounded half to even and clipped.
///
/// An empty input yields a zero grid of [`DEFAULT_STIMULUS_SIZE`] rather
/// than an error. Callers that must tell "no selections" apart from a black
/// composite should check for emptiness first.
pub fn create_composite(arrays: &[StimulusArray]) -> Result<StimulusArray, EngineError> {
    let Some(first) = arrays.first() else {
        warn!("Composite requested over no selections; returning a zero image");
        return Ok(StimulusArray::zeros(DEFAULT_STIMULUS_SIZE));
    };

    let mean = mean_grid(arrays)?;
    let data = mean.into_iter().map(quantize).collect();
    Ok(StimulusArray::from_cells(first.width(), first.height(), data))
}
