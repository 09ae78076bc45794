//! Target letters used by the ideal observer and training stimuli.

use serde::{Deserialize, Serialize};

use super::StimulusArray;

/// Ink and background intensities of rendered glyphs.
pub const INK: u8 = 0;
pub const BACKGROUND: u8 = 255;

const GLYPH_WIDTH: usize = 5;
const GLYPH_HEIGHT: usize = 7;

const GLYPH_S: [&str; GLYPH_HEIGHT] = [
    ".###.", "#...#", "#....", ".###.", "....#", "#...#", ".###.",
];

const GLYPH_J: [&str; GLYPH_HEIGHT] = [
    "..###", "...#.", "...#.", "...#.", "...#.", "#..#.", ".##..",
];

/// A target pattern plus a larger copy for on-screen display.
///
/// Only `array` takes part in selection; `display` is handed to the
/// presentation layer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub array: StimulusArray,
    pub display: StimulusArray,
}

impl Target {
    /// Wrap externally supplied grids.
    pub fn new(array: StimulusArray, display: StimulusArray) -> Self {
        Self { array, display }
    }

    /// Render one of the built-in letters (`S` or `J`).
    pub fn letter(ch: char, size: usize, display_size: usize) -> Option<Self> {
        Some(Self {
            array: render_glyph(ch, size)?,
            display: render_glyph(ch, display_size)?,
        })
    }
}

fn glyph(ch: char) -> Option<&'static [&'static str; GLYPH_HEIGHT]> {
    match ch.to_ascii_uppercase() {
        'S' => Some(&GLYPH_S),
        'J' => Some(&GLYPH_J),
        _ => None,
    }
}

/// Render a built-in letter centred on a `size` x `size` canvas.
///
/// The glyph spans three quarters of the canvas height.
pub fn render_glyph(ch: char, size: usize) -> Option<StimulusArray> {
    let rows = glyph(ch)?;
    let box_h = (size * 3 / 4).max(1);
    let box_w = (box_h * GLYPH_WIDTH / GLYPH_HEIGHT).max(1);
    let top = (size - box_h.min(size)) / 2;
    let left = (size - box_w.min(size)) / 2;

    Some(StimulusArray::from_fn(size, size, |row, col| {
        if row < top || col < left || row >= top + box_h || col >= left + box_w {
            return BACKGROUND;
        }
        let gr = (row - top) * GLYPH_HEIGHT / box_h;
        let gc = (col - left) * GLYPH_WIDTH / box_w;
        if rows[gr].as_bytes()[gc] == b'#' {
            INK
        } else {
            BACKGROUND
        }
    }))
}
