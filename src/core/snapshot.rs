//! Double-buffered grid snapshots
//!
//! Two fixed-size grids live here: the cells captured this tick and the cells
//! the window currently shows. They are overwritten in place every tick and
//! only reallocated when the visible window changes size.

use tracing::info;

use super::grid::{Cell, GridSource, ViewportGeometry};

/// Current and previous character grids for the visible window
pub struct SnapshotBuffer {
    geometry: ViewportGeometry,
    current: Vec<Cell>,
    previous: Vec<Cell>,
    /// Origin or logical buffer size changed on the last capture
    viewport_moved: bool,
    captured: bool,
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self {
            geometry: ViewportGeometry::default(),
            current: Vec::new(),
            previous: Vec::new(),
            viewport_moved: false,
            captured: false,
        }
    }

    /// Pull geometry and every visible cell from `source` into the current grid.
    ///
    /// Returns `true` when the window width or height changed (or on the first
    /// capture). Both grids are then reallocated and no diff is meaningful
    /// until the caller has done a full repaint.
    pub fn capture<S: GridSource + ?Sized>(&mut self, source: &mut S) -> bool {
        source.refresh();
        let geometry = source.geometry();

        let resized = !self.captured || !geometry.same_size(&self.geometry);
        self.viewport_moved = self.captured
            && !resized
            && (geometry.origin_x != self.geometry.origin_x
                || geometry.origin_y != self.geometry.origin_y
                || geometry.buffer_width != self.geometry.buffer_width
                || geometry.buffer_height != self.geometry.buffer_height);

        if resized {
            info!(
                "Snapshot resize: {}x{} -> {}x{}",
                self.geometry.width, self.geometry.height, geometry.width, geometry.height
            );
            self.current = vec![Cell::default(); geometry.cell_count()];
            self.previous = vec![Cell::default(); geometry.cell_count()];
        }
        self.geometry = geometry;
        self.captured = true;

        for y in 0..geometry.height {
            let row = y * geometry.width;
            for x in 0..geometry.width {
                self.current[row + x] = source.cell_at(x, y);
            }
        }

        resized
    }

    /// Copy the current grid over the previous one
    pub fn commit(&mut self) {
        self.previous.copy_from_slice(&self.current);
    }

    pub fn geometry(&self) -> &ViewportGeometry {
        &self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    /// True when the last capture scrolled the window or resized the logical buffer
    /// without changing the window size
    pub fn viewport_moved(&self) -> bool {
        self.viewport_moved
    }

    pub fn current(&self) -> &[Cell] {
        &self.current
    }

    pub fn previous(&self) -> &[Cell] {
        &self.previous
    }

    /// Cell from the current grid; out-of-range positions give an empty cell
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if x < 0 || y < 0 {
            return Cell::default();
        }
        let (x, y) = (x as usize, y as usize);
        if !self.geometry.contains(x, y) {
            return Cell::default();
        }
        self.current[y * self.geometry.width + x]
    }
}
