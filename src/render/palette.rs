//! Console palette
//!
//! Sixteen colors addressed by cell attribute nibbles, the two entries used to
//! highlight the cursor, and the opacity of cell background fills.

use super::canvas::Rgb;
use crate::core::grid::NUM_COLORS;

/// Colors used to paint cells
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; NUM_COLORS],
    cursor_fore: u8,
    cursor_back: u8,
    draw_alpha: u8,
}

impl Palette {
    pub fn new(colors: [Rgb; NUM_COLORS], cursor_fore: u8, cursor_back: u8, draw_alpha: u8) -> Self {
        Self {
            colors,
            cursor_fore: clamp_index(cursor_fore),
            cursor_back: clamp_index(cursor_back),
            draw_alpha,
        }
    }

    /// Color for a palette index; indices past 15 are clamped
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[clamp_index(index) as usize]
    }

    pub fn colors(&self) -> &[Rgb; NUM_COLORS] {
        &self.colors
    }

    pub fn cursor_fore(&self) -> u8 {
        self.cursor_fore
    }

    pub fn cursor_back(&self) -> u8 {
        self.cursor_back
    }

    /// Opacity of cell background fills over the backdrop (0..255)
    pub fn draw_alpha(&self) -> u8 {
        self.draw_alpha
    }

    /// Glyph and fill colors for a cell, swapping in the cursor entries when highlighted
    pub fn cell_colors(&self, fore: u8, back: u8, highlighted: bool) -> (Rgb, Rgb) {
        if highlighted {
            (self.color(self.cursor_fore), self.color(self.cursor_back))
        } else {
            (self.color(fore), self.color(back))
        }
    }
}

fn clamp_index(index: u8) -> u8 {
    index.min(NUM_COLORS as u8 - 1)
}
