//! Glyph rasterization
//!
//! Font handling lives behind [`GlyphRasterizer`]. The built-in [`BlockGlyphs`]
//! draws coarse ink shapes, enough to read layout and color at preview scale.

use unicode_width::UnicodeWidthChar;

use super::canvas::{Canvas, PixelRect, Rgb};

/// Size of one text cell in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

impl CellMetrics {
    /// Metrics from a measured glyph box plus an integer width correction
    pub fn from_font(measured_width: u32, measured_height: u32, width_adjust: i32) -> Self {
        let width = (measured_width as i64 + width_adjust as i64).max(1) as u32;
        Self {
            width,
            height: measured_height.max(1),
        }
    }

    /// Pixel rectangle of the cell at grid position `(x, y)`
    pub fn cell_rect(&self, x: u32, y: u32) -> PixelRect {
        PixelRect::new(x * self.width, y * self.height, self.width, self.height)
    }
}

/// Draws a single glyph into a cell rectangle
pub trait GlyphRasterizer {
    fn draw(&self, canvas: &mut Canvas, cell: PixelRect, glyph: char, color: Rgb);
}

/// Coarse built-in glyph shapes
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockGlyphs;

impl GlyphRasterizer for BlockGlyphs {
    fn draw(&self, canvas: &mut Canvas, cell: PixelRect, glyph: char, color: Rgb) {
        if let Some(ink) = Self::ink(cell, glyph) {
            canvas.fill_rect(ink, color);
        }
    }
}

impl BlockGlyphs {
    /// Inked area for `glyph` inside `cell`, `None` for blank glyphs
    pub fn ink(cell: PixelRect, glyph: char) -> Option<PixelRect> {
        if glyph == ' ' || glyph.is_control() || glyph.width().unwrap_or(0) == 0 {
            return None;
        }
        let (w, h) = (cell.width, cell.height);
        let (x, y) = (cell.x, cell.y);
        let stroke_w = (w / 6).max(1);
        let stroke_h = (h / 8).max(1);

        let rect = match glyph {
            '█' => cell,
            '▀' => PixelRect::new(x, y, w, h / 2),
            '▄' => PixelRect::new(x, y + h / 2, w, h - h / 2),
            '_' => PixelRect::new(x, y + h - stroke_h, w, stroke_h),
            '-' | '─' | '━' => PixelRect::new(x, y + h / 2, w, stroke_h),
            '|' | '│' | '┃' => PixelRect::new(x + w / 2, y, stroke_w, h),
            '.' | ',' => PixelRect::new(x + w / 2, y + h * 3 / 4, stroke_w, stroke_h),
            c if c.is_lowercase() => {
                PixelRect::new(x + stroke_w, y + h * 3 / 8, w.saturating_sub(2 * stroke_w), h / 2)
            }
            _ => PixelRect::new(
                x + stroke_w,
                y + h / 8,
                w.saturating_sub(2 * stroke_w),
                h * 3 / 4,
            ),
        };
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }
}
