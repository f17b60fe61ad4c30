//! Compositor
//!
//! Owns the persistent pixel canvas for the text area, the background layer
//! behind it and the scrollbar layer. Each redraw either repaints the whole
//! frame or patches the damaged cells only, depending on how much changed.
//!
//! # Layout
//!
//! ```text
//! +---------------------------+---+
//! | text area                 | s |
//! | width x height cells      | b |
//! +---------------------------+---+
//! ```
//!
//! The scrollbar gutter is one cell wide. The background layer spans both.

use std::io;

use tracing::{debug, info, warn};

use super::background::{BackgroundProvider, ScreenRect};
use super::canvas::{Canvas, PixelRect, Rgb};
use super::glyph::{BlockGlyphs, CellMetrics, GlyphRasterizer};
use super::palette::Palette;
use crate::core::damage::{CursorState, DamagePoint};
use crate::core::grid::ViewportGeometry;
use crate::core::scroll::{ScrollMapper, ThumbRect};
use crate::core::snapshot::SnapshotBuffer;

/// Default divisor for the patch limit: more than `width / 4` damaged cells
/// triggers a full repaint
pub const DEFAULT_PATCH_LIMIT_DIVISOR: usize = 4;

/// Drawing target receiving composed pixels
pub trait Surface {
    /// Copy `src_rect` of `src` to `(dest_x, dest_y)` in window coordinates
    fn blit(&mut self, src: &Canvas, src_rect: PixelRect, dest_x: u32, dest_y: u32) -> io::Result<()>;

    fn set_title(&mut self, _title: &str) -> io::Result<()> {
        Ok(())
    }

    /// Called once after all blits of a redraw
    fn present(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Surface keeping the composed frame in memory and recording every blit.
///
/// The frame grows as needed to hold every blit.
pub struct MemorySurface {
    frame: Canvas,
    blits: Vec<PixelRect>,
    title: String,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: Canvas::new(width, height, Rgb::BLACK),
            blits: Vec::new(),
            title: String::new(),
        }
    }

    /// Resize the frame to `width` x `height`, keeping the overlapping contents
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.frame.width() == width && self.frame.height() == height {
            return;
        }
        let mut frame = Canvas::new(width, height, Rgb::BLACK);
        frame.copy_from(&self.frame, self.frame.bounds(), 0, 0);
        self.frame = frame;
    }

    pub fn frame(&self) -> &Canvas {
        &self.frame
    }

    /// Destination rectangles of all blits since the last `take_blits`
    pub fn blits(&self) -> &[PixelRect] {
        &self.blits
    }

    pub fn take_blits(&mut self) -> Vec<PixelRect> {
        std::mem::take(&mut self.blits)
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Surface for MemorySurface {
    fn blit(&mut self, src: &Canvas, src_rect: PixelRect, dest_x: u32, dest_y: u32) -> io::Result<()> {
        let right = dest_x + src_rect.width;
        let bottom = dest_y + src_rect.height;
        if right > self.frame.width() || bottom > self.frame.height() {
            // Grow to cover the blit, keeping what is already there
            let mut frame = Canvas::new(
                right.max(self.frame.width()),
                bottom.max(self.frame.height()),
                Rgb::BLACK,
            );
            frame.copy_from(&self.frame, self.frame.bounds(), 0, 0);
            self.frame = frame;
        }
        self.frame.copy_from(src, src_rect, dest_x, dest_y);
        self.blits
            .push(PixelRect::new(dest_x, dest_y, src_rect.width, src_rect.height));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.title = title.to_string();
        Ok(())
    }
}

/// Strategy picked by a redraw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedrawMode {
    /// Every cell plus the scrollbar
    Full,
    /// Only the damaged cells
    Patch,
    /// Nothing drawn: the compositor has not been sized for the snapshot yet
    Skipped,
}

/// Redraw tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorOptions {
    /// Full repaint once damage exceeds `width / patch_limit_divisor` cells
    pub patch_limit_divisor: usize,
    /// Recompute the scrollbar thumb on patch redraws too, redrawing it when it moved
    pub refresh_thumb_every_tick: bool,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            patch_limit_divisor: DEFAULT_PATCH_LIMIT_DIVISOR,
            refresh_thumb_every_tick: true,
        }
    }
}

/// Counters for the strategies actually executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedrawMetrics {
    pub full_frames: u64,
    pub patch_frames: u64,
    /// Full frames chosen because the damage list was over the patch limit
    pub escalated_large_set: u64,
    pub cells_patched: u64,
    /// Scrollbar redraws done during patch frames
    pub thumb_refreshes: u64,
    pub resizes: u64,
}

/// Double-buffered cell compositor
pub struct Compositor<G: GlyphRasterizer = BlockGlyphs> {
    metrics: CellMetrics,
    palette: Palette,
    glyphs: G,
    options: CompositorOptions,
    geometry: ViewportGeometry,
    sized: bool,
    canvas: Canvas,
    background: Canvas,
    gutter: Canvas,
    thumb: ThumbRect,
    force_full: bool,
    stats: RedrawMetrics,
}

impl<G: GlyphRasterizer> Compositor<G> {
    pub fn new(metrics: CellMetrics, palette: Palette, glyphs: G, options: CompositorOptions) -> Self {
        Self {
            metrics,
            palette,
            glyphs,
            options: CompositorOptions {
                patch_limit_divisor: options.patch_limit_divisor.max(1),
                ..options
            },
            geometry: ViewportGeometry::default(),
            sized: false,
            canvas: Canvas::new(0, 0, Rgb::BLACK),
            background: Canvas::new(0, 0, Rgb::BLACK),
            gutter: Canvas::new(0, 0, Rgb::BLACK),
            thumb: ThumbRect::default(),
            force_full: true,
            stats: RedrawMetrics::default(),
        }
    }

    /// Reallocate the canvas for `geometry`, fetch a matching background layer
    /// and make the next redraw a full one
    pub fn resize(
        &mut self,
        geometry: &ViewportGeometry,
        window_origin: (i32, i32),
        provider: &mut dyn BackgroundProvider,
    ) {
        self.geometry = *geometry;
        self.sized = true;
        let (text_width, text_height) = self.text_size();
        let (screen_width, screen_height) = self.screen_size();
        info!(
            "Compositor resize: {}x{} cells, {}x{} px",
            geometry.width, geometry.height, screen_width, screen_height
        );

        self.canvas = Canvas::new(text_width, text_height, Rgb::BLACK);
        self.gutter = Canvas::new(self.metrics.width, text_height, Rgb::BLACK);
        self.reload_background(window_origin, provider);
        self.stats.resizes += 1;
    }

    /// Fetch the background layer for the window at `window_origin` and force a full redraw
    pub fn reload_background(&mut self, window_origin: (i32, i32), provider: &mut dyn BackgroundProvider) {
        let (width, height) = self.screen_size();
        let target = ScreenRect {
            x: window_origin.0,
            y: window_origin.1,
            width,
            height,
        };
        let layer = provider.background(target);
        self.background = if layer.width() == width && layer.height() == height {
            layer
        } else {
            warn!(
                "Background layer is {}x{}, expected {}x{}; using a blank layer",
                layer.width(),
                layer.height(),
                width,
                height
            );
            Canvas::new(width, height, Rgb::BLACK)
        };
        self.force_full = true;
    }

    /// Drop the pixel buffers. Redraws are skipped until the next `resize`.
    pub fn release(&mut self) {
        self.canvas = Canvas::new(0, 0, Rgb::BLACK);
        self.background = Canvas::new(0, 0, Rgb::BLACK);
        self.gutter = Canvas::new(0, 0, Rgb::BLACK);
        self.sized = false;
        self.force_full = true;
        info!("Compositor released");
    }

    /// Text area size in pixels
    pub fn text_size(&self) -> (u32, u32) {
        (
            self.geometry.width as u32 * self.metrics.width,
            self.geometry.height as u32 * self.metrics.height,
        )
    }

    /// Text area plus scrollbar gutter, in pixels
    pub fn screen_size(&self) -> (u32, u32) {
        let (width, height) = self.text_size();
        (width + self.metrics.width, height)
    }

    pub fn cell_metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn background(&self) -> &Canvas {
        &self.background
    }

    /// Thumb as last drawn
    pub fn thumb(&self) -> ThumbRect {
        self.thumb
    }

    pub fn stats(&self) -> RedrawMetrics {
        self.stats
    }

    /// Largest damage list still drawn in patch mode
    pub fn patch_limit(&self) -> usize {
        self.geometry.width / self.options.patch_limit_divisor
    }

    /// Check if `damage` would be drawn as a full frame
    pub fn needs_full(&self, damage: Option<&[DamagePoint]>) -> bool {
        match damage {
            None => true,
            Some(points) => self.force_full || points.len() > self.patch_limit(),
        }
    }

    /// Thumb for `geometry` in this compositor's gutter
    pub fn compute_thumb(&self, geometry: &ViewportGeometry) -> ThumbRect {
        let (text_width, text_height) = self.text_size();
        ScrollMapper::thumb_rect(
            geometry,
            text_width as f32,
            self.metrics.width as f32,
            text_height as f32,
        )
    }

    /// Draw the snapshot, all of it (`damage` absent or large) or only the damaged cells
    pub fn redraw(
        &mut self,
        snapshot: &SnapshotBuffer,
        cursor: &CursorState,
        damage: Option<&[DamagePoint]>,
        surface: &mut dyn Surface,
    ) -> io::Result<RedrawMode> {
        if !self.sized || !snapshot.geometry().same_size(&self.geometry) {
            warn!(
                "Redraw skipped: snapshot {}x{} does not match compositor {}x{}",
                snapshot.width(),
                snapshot.height(),
                self.geometry.width,
                self.geometry.height
            );
            return Ok(RedrawMode::Skipped);
        }
        self.geometry = *snapshot.geometry();

        let mode = if self.needs_full(damage) {
            if damage.is_some() && !self.force_full {
                self.stats.escalated_large_set += 1;
            }
            self.redraw_full(snapshot, cursor, surface)?;
            RedrawMode::Full
        } else {
            self.redraw_patch(snapshot, cursor, damage.unwrap_or_default(), surface)?;
            RedrawMode::Patch
        };
        surface.present()?;

        debug!(
            "redraw {:?}: {} damage points",
            mode,
            damage.map_or(0, |d| d.len())
        );
        Ok(mode)
    }

    fn redraw_full(
        &mut self,
        snapshot: &SnapshotBuffer,
        cursor: &CursorState,
        surface: &mut dyn Surface,
    ) -> io::Result<()> {
        self.thumb = self.compute_thumb(&self.geometry);

        let bounds = self.canvas.bounds();
        self.canvas.copy_from(&self.background, bounds, 0, 0);
        for y in 0..self.geometry.height as i32 {
            for x in 0..self.geometry.width as i32 {
                self.paint_cell(snapshot, cursor, x, y);
            }
        }

        surface.blit(&self.canvas, bounds, 0, 0)?;
        self.draw_scrollbar(surface)?;

        self.force_full = false;
        self.stats.full_frames += 1;
        Ok(())
    }

    fn redraw_patch(
        &mut self,
        snapshot: &SnapshotBuffer,
        cursor: &CursorState,
        damage: &[DamagePoint],
        surface: &mut dyn Surface,
    ) -> io::Result<()> {
        for point in damage {
            if point.x < 0
                || point.y < 0
                || !self.geometry.contains(point.x as usize, point.y as usize)
            {
                continue;
            }
            let rect = self.metrics.cell_rect(point.x as u32, point.y as u32);
            // The cursor cell is blended over what is already there
            if !cursor.is_at(point.x, point.y) {
                self.canvas.restore_from(&self.background, rect);
            }
            self.paint_cell(snapshot, cursor, point.x, point.y);
            surface.blit(&self.canvas, rect, rect.x, rect.y)?;
            self.stats.cells_patched += 1;
        }

        if self.options.refresh_thumb_every_tick {
            let thumb = self.compute_thumb(&self.geometry);
            if thumb != self.thumb {
                self.thumb = thumb;
                self.draw_scrollbar(surface)?;
                self.stats.thumb_refreshes += 1;
            }
        }

        self.stats.patch_frames += 1;
        Ok(())
    }

    /// Fill the cell background and draw its glyph
    fn paint_cell(&mut self, snapshot: &SnapshotBuffer, cursor: &CursorState, x: i32, y: i32) {
        let cell = snapshot.cell(x, y);
        let (fore, back) = self
            .palette
            .cell_colors(cell.fore, cell.back, cursor.highlights(x, y));
        let rect = self.metrics.cell_rect(x as u32, y as u32);
        self.canvas.blend_rect(rect, back, self.palette.draw_alpha());
        self.glyphs.draw(&mut self.canvas, rect, cell.glyph, fore);
    }

    /// Backdrop slice for the gutter with the thumb on top
    fn draw_scrollbar(&mut self, surface: &mut dyn Surface) -> io::Result<()> {
        let (text_width, text_height) = self.text_size();
        let gutter_rect = PixelRect::new(text_width, 0, self.metrics.width, text_height);
        self.gutter.copy_from(&self.background, gutter_rect, 0, 0);

        let top = self.thumb.top.max(0.0).floor() as u32;
        let bottom = self.thumb.bottom().max(0.0).ceil() as u32;
        let thumb_rect = PixelRect::new(0, top, self.metrics.width, bottom.saturating_sub(top));
        self.gutter.blend_rect(
            thumb_rect,
            self.palette.color(self.palette.cursor_back()),
            self.palette.draw_alpha(),
        );

        let bounds = self.gutter.bounds();
        surface.blit(&self.gutter, bounds, text_width, 0)
    }
}
