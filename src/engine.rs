//! Mirror engine
//!
//! Drives one tick at a time: capture the grid, compute damage, redraw by
//! policy. Pointer clicks, key forwarding and window moves run between
//! ticks on the same thread, never during one.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::damage::{CursorState, DamageTracker};
use crate::core::grid::{GridSource, KeyInput};
use crate::core::scroll::ScrollMapper;
use crate::core::snapshot::SnapshotBuffer;
use crate::render::background::BackgroundProvider;
use crate::render::compositor::{Compositor, CompositorOptions, RedrawMetrics, RedrawMode, Surface};
use crate::render::glyph::{BlockGlyphs, CellMetrics, GlyphRasterizer};
use crate::render::palette::Palette;

/// What a tick did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed, nothing drawn
    Idle,
    /// This many damaged cells were patched
    Patched(usize),
    /// Whole frame repainted
    Full,
    /// The mirror is closed; no work was done
    Closed,
}

/// Settings fixed at construction
#[derive(Clone, Copy, Debug)]
pub struct MirrorOptions {
    pub metrics: CellMetrics,
    /// Ticks between cursor blink toggles
    pub blink_rate: u32,
    pub compositor: CompositorOptions,
    /// Screen position of the window's client area
    pub window_origin: (i32, i32),
}

/// Mirrors a grid source onto a surface
pub struct Mirror<S: GridSource, G: GlyphRasterizer = BlockGlyphs> {
    source: S,
    snapshot: SnapshotBuffer,
    tracker: DamageTracker,
    compositor: Compositor<G>,
    background: Box<dyn BackgroundProvider>,
    window_origin: (i32, i32),
    /// Last title pushed to the surface
    title: Option<String>,
    /// Set by window moves: repaint on the next tick even if idle
    pending_full: bool,
    closed: Arc<AtomicBool>,
    released: bool,
}

impl<S: GridSource, G: GlyphRasterizer> Mirror<S, G> {
    pub fn new(
        source: S,
        palette: Palette,
        glyphs: G,
        background: Box<dyn BackgroundProvider>,
        options: MirrorOptions,
    ) -> Self {
        info!(
            "Mirror created: cell {}x{}, blink rate {}, patch divisor {}",
            options.metrics.width,
            options.metrics.height,
            options.blink_rate,
            options.compositor.patch_limit_divisor
        );
        Self {
            source,
            snapshot: SnapshotBuffer::new(),
            tracker: DamageTracker::new(options.blink_rate),
            compositor: Compositor::new(options.metrics, palette, glyphs, options.compositor),
            background,
            window_origin: options.window_origin,
            title: None,
            pending_full: false,
            closed: Arc::new(AtomicBool::new(false)),
            released: false,
        }
    }

    /// Run one capture, diff and redraw cycle
    pub fn tick(&mut self, surface: &mut dyn Surface) -> io::Result<TickOutcome> {
        if self.is_closed() {
            if !self.released {
                self.compositor.release();
                self.released = true;
            }
            return Ok(TickOutcome::Closed);
        }

        let resized = self.snapshot.capture(&mut self.source);
        // Damage is computed every tick so the blink period stays regular
        let damage = self.tracker.compute_damage(
            &mut self.snapshot,
            self.source.cursor_x(),
            self.source.cursor_y(),
        );
        self.sync_title(surface)?;

        let cursor = *self.tracker.cursor();
        let mode = if resized {
            self.compositor.resize(
                self.snapshot.geometry(),
                self.window_origin,
                self.background.as_mut(),
            );
            let mode = self.compositor.redraw(&self.snapshot, &cursor, None, surface)?;
            self.snapshot.commit();
            mode
        } else if self.snapshot.viewport_moved() || self.pending_full {
            self.compositor.redraw(&self.snapshot, &cursor, None, surface)?
        } else if !damage.is_empty() {
            self.compositor
                .redraw(&self.snapshot, &cursor, Some(&damage), surface)?
        } else {
            return Ok(TickOutcome::Idle);
        };

        let outcome = match mode {
            RedrawMode::Full => {
                self.pending_full = false;
                TickOutcome::Full
            }
            RedrawMode::Patch => TickOutcome::Patched(damage.len()),
            RedrawMode::Skipped => TickOutcome::Idle,
        };
        debug!("tick: {:?}", outcome);
        Ok(outcome)
    }

    fn sync_title(&mut self, surface: &mut dyn Surface) -> io::Result<()> {
        let title = self.source.title();
        if self.title.as_deref() != Some(title.as_str()) {
            surface.set_title(&title)?;
            self.title = Some(title);
        }
        Ok(())
    }

    /// Handle a pointer click at window pixel `(x, y)`.
    ///
    /// Clicks in the scrollbar gutter above the thumb's bottom edge scroll the
    /// source; the requested top row is returned.
    pub fn on_click(&mut self, x: f32, y: f32) -> Option<usize> {
        if self.is_closed() {
            return None;
        }
        let (text_width, client_height) = self.compositor.text_size();
        let top_row = ScrollMapper::top_row_for_click(
            x,
            y,
            text_width as f32,
            client_height as f32,
            &self.compositor.thumb(),
            self.snapshot.geometry(),
        )?;
        debug!("scroll click at ({}, {}) -> row {}", x, y, top_row);
        self.source.request_scroll_to(top_row);
        Some(top_row)
    }

    /// The window moved to screen position `(x, y)`: fetch the backdrop under it
    pub fn on_move(&mut self, x: i32, y: i32) {
        if self.window_origin == (x, y) {
            return;
        }
        self.window_origin = (x, y);
        if self.is_closed() || self.snapshot.width() == 0 {
            return;
        }
        self.compositor
            .reload_background(self.window_origin, self.background.as_mut());
        self.pending_full = true;
    }

    pub fn send_key(&mut self, key: KeyInput) {
        if !self.is_closed() {
            self.source.send_key(key);
        }
    }

    /// Stop ticking; resources are released on the next tick
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Shared handle to the closed flag
    pub fn closer(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn snapshot(&self) -> &SnapshotBuffer {
        &self.snapshot
    }

    pub fn cursor(&self) -> &CursorState {
        self.tracker.cursor()
    }

    pub fn compositor(&self) -> &Compositor<G> {
        &self.compositor
    }

    pub fn stats(&self) -> RedrawMetrics {
        self.compositor.stats()
    }

    /// Window size in pixels (text area plus scrollbar gutter)
    pub fn screen_size(&self) -> (u32, u32) {
        self.compositor.screen_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Cell, NUM_COLORS};
    use crate::core::memory::MemoryGrid;
    use crate::render::background::{BlankBackground, ScreenRect};
    use crate::render::canvas::{Canvas, PixelRect, Rgb};
    use crate::render::compositor::MemorySurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CELL: CellMetrics = CellMetrics {
        width: 2,
        height: 4,
    };

    #[derive(Clone, Default)]
    struct Counter {
        cells: Rc<RefCell<usize>>,
    }

    impl GlyphRasterizer for Counter {
        fn draw(&self, canvas: &mut Canvas, cell: PixelRect, glyph: char, color: Rgb) {
            *self.cells.borrow_mut() += 1;
            BlockGlyphs.draw(canvas, cell, glyph, color);
        }
    }

    /// Backdrop provider remembering every requested rectangle
    #[derive(Clone, Default)]
    struct Requests {
        targets: Rc<RefCell<Vec<ScreenRect>>>,
    }

    impl BackgroundProvider for Requests {
        fn background(&mut self, target: ScreenRect) -> Canvas {
            self.targets.borrow_mut().push(target);
            BlankBackground::new(Rgb::BLACK).background(target)
        }
    }

    fn options(blink_rate: u32) -> MirrorOptions {
        MirrorOptions {
            metrics: CELL,
            blink_rate,
            compositor: CompositorOptions::default(),
            window_origin: (0, 0),
        }
    }

    fn mirror(grid: MemoryGrid, blink_rate: u32) -> (Mirror<MemoryGrid, Counter>, Counter, Requests) {
        let counter = Counter::default();
        let requests = Requests::default();
        let palette = Palette::new([Rgb::BLACK; NUM_COLORS], 0, 10, 0xa0);
        let mirror = Mirror::new(
            grid,
            palette,
            counter.clone(),
            Box::new(requests.clone()),
            options(blink_rate),
        );
        (mirror, counter, requests)
    }

    fn blank_grid(width: usize, height: usize, buffer_height: usize) -> MemoryGrid {
        let mut grid = MemoryGrid::new(width, height, buffer_height);
        grid.fill(Cell::new(' ', 7, 0));
        grid
    }

    #[test]
    fn test_small_grid_scenario() {
        let mut grid = blank_grid(10, 2, 2);
        grid.put(3, 1, Cell::new('a', 7, 0));
        let (mut mirror, _, _) = mirror(grid, 5);
        let mut surface = MemorySurface::new(22, 8);

        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        assert!(mirror.cursor().visible);

        // Identical content, no blink due
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Idle);

        mirror.source_mut().put(3, 1, Cell::new('b', 7, 0));
        surface.take_blits();
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Patched(2));
        assert_eq!(
            surface.blits(),
            &[CELL.cell_rect(3, 1), CELL.cell_rect(0, 0)]
        );
    }

    #[test]
    fn test_resize_repaints_every_cell() {
        let (mut mirror, counter, requests) = mirror(blank_grid(80, 24, 24), 5);
        let mut surface = MemorySurface::new(0, 0);
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        assert_eq!(*counter.cells.borrow(), 80 * 24);

        mirror.source_mut().resize_view(100, 30);
        *counter.cells.borrow_mut() = 0;
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        assert_eq!(*counter.cells.borrow(), 3000);

        // A fresh backdrop for each size, covering text area and gutter
        let targets = requests.targets.borrow();
        assert_eq!(targets.len(), 2);
        assert_eq!((targets[1].width, targets[1].height), (101 * 2, 30 * 4));
        assert_eq!(mirror.stats().resizes, 2);
    }

    #[test]
    fn test_surface_follows_shrinking_source() {
        let (mut mirror, _, _) = mirror(blank_grid(30, 10, 10), 5);
        let mut surface = MemorySurface::new(0, 0);
        mirror.tick(&mut surface).unwrap();
        let (w, h) = mirror.screen_size();
        surface.resize(w, h);
        assert_eq!((surface.frame().width(), surface.frame().height()), (62, 40));

        mirror.source_mut().resize_view(10, 2);
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        let (w, h) = mirror.screen_size();
        surface.resize(w, h);

        // No pixels of the larger frame survive
        assert_eq!((surface.frame().width(), surface.frame().height()), (22, 8));
        let canvas = mirror.compositor().canvas();
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                assert_eq!(surface.frame().pixel(x, y), canvas.pixel(x, y));
            }
        }
    }

    #[test]
    fn test_blink_redraws_cursor_only() {
        let (mut mirror, _, _) = mirror(blank_grid(10, 2, 2), 2);
        let mut surface = MemorySurface::new(22, 8);
        mirror.tick(&mut surface).unwrap();

        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Idle);
        surface.take_blits();
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Patched(1));
        assert!(!mirror.cursor().visible);
        assert_eq!(surface.blits(), &[CELL.cell_rect(0, 0)]);
    }

    #[test]
    fn test_scroll_click_moves_viewport() {
        // 2 of 8 rows visible: client is 8px tall, thumb covers 0..2
        let (mut mirror, _, _) = mirror(blank_grid(10, 2, 8), 5);
        let mut surface = MemorySurface::new(22, 8);
        mirror.tick(&mut surface).unwrap();

        // Text area and below-thumb clicks are ignored
        assert_eq!(mirror.on_click(5.0, 1.0), None);
        assert_eq!(mirror.on_click(21.0, 3.0), None);

        // 1 / (8 - 2) of a 6-row range
        assert_eq!(mirror.on_click(21.0, 1.0), Some(1));
        assert_eq!(mirror.source().view_origin_y(), 1);

        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        assert!(mirror.snapshot().viewport_moved());
        assert_eq!(mirror.compositor().thumb().top, 1.0);
    }

    #[test]
    fn test_typed_keys_reach_source() {
        let (mut mirror, _, _) = mirror(blank_grid(20, 2, 2), 5);
        let mut surface = MemorySurface::new(42, 8);
        mirror.tick(&mut surface).unwrap();

        mirror.send_key(KeyInput::char('h'));
        assert_eq!(mirror.source().cell_at(0, 0).glyph, 'h');
        // Changed cell, old cursor cell (same point) and new cursor cell
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Patched(3));
    }

    #[test]
    fn test_title_follows_source() {
        let (mut mirror, _, _) = mirror(blank_grid(10, 2, 2), 5);
        let mut surface = MemorySurface::new(22, 8);
        mirror.tick(&mut surface).unwrap();
        assert_eq!(surface.title(), "glasscon");

        mirror.source_mut().set_title("cmd.exe");
        mirror.tick(&mut surface).unwrap();
        assert_eq!(surface.title(), "cmd.exe");
    }

    #[test]
    fn test_move_refetches_backdrop() {
        let (mut mirror, _, requests) = mirror(blank_grid(10, 2, 2), 5);
        let mut surface = MemorySurface::new(22, 8);
        mirror.tick(&mut surface).unwrap();
        mirror.tick(&mut surface).unwrap();

        mirror.on_move(300, 200);
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Full);
        let last = *requests.targets.borrow().last().unwrap();
        assert_eq!((last.x, last.y), (300, 200));

        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn test_closed_flag_stops_ticks() {
        let (mut mirror, _, _) = mirror(blank_grid(10, 2, 2), 5);
        let mut surface = MemorySurface::new(22, 8);
        mirror.tick(&mut surface).unwrap();

        let closer = mirror.closer();
        closer.store(true, Ordering::SeqCst);
        surface.take_blits();

        mirror.source_mut().put(0, 0, Cell::new('x', 7, 0));
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Closed);
        assert_eq!(mirror.tick(&mut surface).unwrap(), TickOutcome::Closed);
        assert!(surface.blits().is_empty());
        assert_eq!(mirror.compositor().canvas().width(), 0);
        assert_eq!(mirror.on_click(21.0, 1.0), None);
    }
}
