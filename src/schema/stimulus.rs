//! Grayscale grid type shared by stimuli, targets and composites.

use serde::{Deserialize, Serialize};

/// Default side length of a stimulus in cells.
pub const DEFAULT_STIMULUS_SIZE: usize = 16;

/// Row-major grid of 8-bit intensities.
///
/// Stimuli are always square; targets may arrive with any shape and are
/// resized before comparison. Once built, a grid is never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct StimulusArray {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

#[derive(Deserialize)]
struct RawGrid {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl TryFrom<RawGrid> for StimulusArray {
    type Error = String;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        let expected = raw.width * raw.height;
        let found = raw.data.len();
        Self::from_vec(raw.width, raw.height, raw.data)
            .ok_or_else(|| format!("grid data has {found} cells, expected {expected}"))
    }
}

/// Shape of a grid as `(height, width)`.
pub type Shape = (usize, usize);

impl StimulusArray {
    /// Build a grid from row-major data. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height) != Some(data.len()) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Grid whose data length is already known to match.
    pub(crate) fn from_cells(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Square grid from row-major data.
    pub fn square(size: usize, data: Vec<u8>) -> Option<Self> {
        Self::from_vec(size, size, data)
    }

    /// Square grid with every cell set to `value`.
    pub fn filled(size: usize, value: u8) -> Self {
        Self {
            width: size,
            height: size,
            data: vec![value; size * size],
        }
    }

    /// Square zero grid.
    pub fn zeros(size: usize) -> Self {
        Self::filled(size, 0)
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`.
    #[inline]
    pub fn shape(&self) -> Shape {
        (self.height, self.width)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major cell values.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Value at `(row, col)`, or `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    /// Combine two grids of the same shape cell by cell. Returns `None` on a
    /// shape mismatch.
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(u8, u8) -> u8) -> Option<Self> {
        if self.shape() != other.shape() {
            return None;
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Some(Self {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks(self.width.max(1))
    }

    /// Nearest-neighbour resize using pixel-centre sampling.
    ///
    /// Destination cell `d` reads source cell `floor((d + 0.5) * src / dst)`.
    /// An empty source has nothing to sample and resizes to zeros.
    pub fn resize_nearest(&self, width: usize, height: usize) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.data.is_empty() {
            return Self::from_fn(width, height, |_, _| 0);
        }
        let src_w = self.width;
        let src_h = self.height;
        let map = |d: usize, src: usize, dst: usize| -> usize {
            let s = ((d as f64 + 0.5) * src as f64 / dst as f64).floor() as usize;
            s.min(src.saturating_sub(1))
        };
        Self::from_fn(width, height, |row, col| {
            let sr = map(row, src_h, height);
            let sc = map(col, src_w, width);
            self.data[sr * src_w + sc]
        })
    }
}

/// Round half to even and clip into the 8-bit range.
///
/// Every float-to-intensity conversion in the crate goes through here, so
/// `99.5` becomes `100` and `98.5` becomes `98`.
#[inline]
pub fn quantize(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(StimulusArray::from_vec(4, 4, vec![0; 15]).is_none());
        assert!(StimulusArray::square(4, vec![0; 16]).is_some());
    }

    #[test]
    fn test_get_bounds() {
        let grid = StimulusArray::from_fn(3, 2, |r, c| (r * 10 + c) as u8);
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.get(1, 2), Some(12));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, 3), None);
    }

    #[test]
    fn test_resize_nearest_downscale() {
        // 4x4 blocks of 2x2 -> 2x2 picks one cell from each block
        let grid = StimulusArray::from_fn(4, 4, |r, c| ((r / 2) * 2 + c / 2) as u8);
        let small = grid.resize_nearest(2, 2);
        assert_eq!(small.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_resize_nearest_upscale() {
        let grid = StimulusArray::square(2, vec![1, 2, 3, 4]).unwrap();
        let big = grid.resize_nearest(4, 4);
        assert_eq!(
            big.as_slice(),
            &[1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
    }

    #[test]
    fn test_resize_empty_source_gives_zeros() {
        let empty = StimulusArray::from_vec(0, 0, Vec::new()).unwrap();
        assert_eq!(empty.resize_nearest(4, 4), StimulusArray::zeros(4));

        let no_rows = StimulusArray::from_vec(3, 0, Vec::new()).unwrap();
        assert_eq!(no_rows.resize_nearest(2, 2), StimulusArray::zeros(2));
    }

    #[test]
    fn test_resize_same_shape_is_identity() {
        let grid = StimulusArray::from_fn(5, 5, |r, c| (r + c) as u8);
        assert_eq!(grid.resize_nearest(5, 5), grid);
    }

    #[test]
    fn test_quantize_ties_to_even() {
        assert_eq!(quantize(99.5), 100);
        assert_eq!(quantize(98.5), 98);
        assert_eq!(quantize(242.25), 242);
        assert_eq!(quantize(-3.0), 0);
        assert_eq!(quantize(300.7), 255);
    }

    #[test]
    fn test_serialization() {
        let grid = StimulusArray::filled(3, 7);
        let json = serde_json::to_string(&grid).unwrap();
        let parsed: StimulusArray = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, grid);

        let bad = r#"{"width":2,"height":2,"data":[1,2,3]}"#;
        assert!(serde_json::from_str::<StimulusArray>(bad).is_err());
    }
}
