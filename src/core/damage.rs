//! Damage computation and cursor blinking
//!
//! Diffs the current snapshot against the previous one and adds cursor
//! pseudo-damage: the old cursor cell when the cursor moved, and the current
//! cursor cell whenever anything is redrawn or the blink phase flips.

use tracing::trace;

use super::grid::Cell;
use super::snapshot::SnapshotBuffer;

/// A grid coordinate that must be redrawn.
///
/// Signed because the cursor may sit outside the visible window for a tick
/// while the source is being resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DamagePoint {
    pub x: i32,
    pub y: i32,
}

impl DamagePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for DamagePoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Cursor blink phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkPhase {
    Visible,
    Hidden,
}

/// Cursor position and blink state carried across ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    /// Ticks left before the next blink toggle
    pub blink_countdown: u32,
}

impl Default for CursorState {
    fn default() -> Self {
        // Countdown starts expired so the cursor shows up on the first tick
        Self {
            x: 0,
            y: 0,
            visible: false,
            blink_countdown: 0,
        }
    }
}

impl CursorState {
    pub fn phase(&self) -> BlinkPhase {
        if self.visible {
            BlinkPhase::Visible
        } else {
            BlinkPhase::Hidden
        }
    }

    /// Check if the cursor highlight is drawn at `(x, y)`
    pub fn highlights(&self, x: i32, y: i32) -> bool {
        self.visible && self.x == x && self.y == y
    }

    pub fn is_at(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }
}

/// Computes per-tick damage and drives the blink state machine
pub struct DamageTracker {
    cursor: CursorState,
    blink_rate: u32,
}

impl DamageTracker {
    /// Create a tracker toggling the cursor every `blink_rate` ticks (0 acts as 1)
    pub fn new(blink_rate: u32) -> Self {
        Self {
            cursor: CursorState::default(),
            blink_rate: blink_rate.max(1),
        }
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    pub fn blink_rate(&self) -> u32 {
        self.blink_rate
    }

    /// Compute this tick's damage for a cursor at `(cursor_x, cursor_y)`.
    ///
    /// Cells are reported in row-major scan order, followed by the old cursor
    /// cell if the cursor moved, followed by the current cursor cell. When the
    /// result is non-empty the snapshot's current grid becomes its previous grid.
    /// An empty result means nothing needs redrawing.
    pub fn compute_damage(
        &mut self,
        snapshot: &mut SnapshotBuffer,
        cursor_x: i32,
        cursor_y: i32,
    ) -> Vec<DamagePoint> {
        let mut damage = diff_cells(snapshot.current(), snapshot.previous(), snapshot.width());

        let moved = !self.cursor.is_at(cursor_x, cursor_y);
        if moved {
            damage.push(DamagePoint::new(self.cursor.x, self.cursor.y));
        }

        let toggled = self.advance_blink();
        if !damage.is_empty() || toggled {
            damage.push(DamagePoint::new(cursor_x, cursor_y));
        }

        self.cursor.x = cursor_x;
        self.cursor.y = cursor_y;

        if !damage.is_empty() {
            snapshot.commit();
        }

        trace!(
            "damage: {} points, cursor ({}, {}) moved={} toggled={}",
            damage.len(),
            cursor_x,
            cursor_y,
            moved,
            toggled
        );
        damage
    }

    /// Count down one tick; returns `true` when the blink phase flipped
    fn advance_blink(&mut self) -> bool {
        self.cursor.blink_countdown = self.cursor.blink_countdown.saturating_sub(1);
        if self.cursor.blink_countdown == 0 {
            self.cursor.blink_countdown = self.blink_rate;
            self.cursor.visible = !self.cursor.visible;
            true
        } else {
            false
        }
    }
}

/// Row-major list of positions whose cells differ between two grids of `width` columns
pub fn diff_cells(current: &[Cell], previous: &[Cell], width: usize) -> Vec<DamagePoint> {
    if width == 0 {
        return Vec::new();
    }
    current
        .iter()
        .zip(previous)
        .enumerate()
        .filter(|(_, (now, before))| now != before)
        .map(|(index, _)| DamagePoint::new((index % width) as i32, (index / width) as i32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GridSource;
    use crate::core::memory::MemoryGrid;
    use proptest::prelude::*;

    fn blank_grid(width: usize, height: usize) -> MemoryGrid {
        let mut grid = MemoryGrid::new(width, height, height);
        grid.fill(Cell::new(' ', 7, 0));
        grid
    }

    /// Capture and settle so the next diff starts from identical grids
    fn settled(grid: &mut MemoryGrid, tracker: &mut DamageTracker) -> SnapshotBuffer {
        let mut snapshot = SnapshotBuffer::new();
        snapshot.capture(grid);
        snapshot.commit();
        // Burn the initial toggle
        tracker.compute_damage(&mut snapshot, grid.cursor_x(), grid.cursor_y());
        snapshot
    }

    #[test]
    fn test_diff_cells_scan_order() {
        let previous = vec![Cell::default(); 6];
        let mut current = previous.clone();
        current[5] = Cell::new('b', 1, 0);
        current[1] = Cell::new('a', 1, 0);
        current[3] = Cell::new('\0', 0, 2);

        assert_eq!(
            diff_cells(&current, &previous, 3),
            vec![
                DamagePoint::new(1, 0),
                DamagePoint::new(0, 1),
                DamagePoint::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_first_tick_shows_cursor() {
        let mut grid = blank_grid(10, 2);
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = SnapshotBuffer::new();
        snapshot.capture(&mut grid);
        snapshot.commit();

        let damage = tracker.compute_damage(&mut snapshot, 0, 0);
        assert_eq!(damage, vec![DamagePoint::new(0, 0)]);
        assert!(tracker.cursor().visible);
        assert_eq!(tracker.cursor().blink_countdown, 5);
    }

    #[test]
    fn test_idle_tick_is_empty() {
        let mut grid = blank_grid(10, 2);
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = settled(&mut grid, &mut tracker);

        snapshot.capture(&mut grid);
        assert!(tracker.compute_damage(&mut snapshot, 0, 0).is_empty());
    }

    #[test]
    fn test_changed_cell_then_cursor() {
        let mut grid = blank_grid(10, 2);
        grid.put(3, 1, Cell::new('a', 7, 0));
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = settled(&mut grid, &mut tracker);

        grid.put(3, 1, Cell::new('b', 7, 0));
        snapshot.capture(&mut grid);
        let damage = tracker.compute_damage(&mut snapshot, 0, 0);
        assert_eq!(damage, vec![DamagePoint::new(3, 1), DamagePoint::new(0, 0)]);

        // Committed: the same frame again is idle
        snapshot.capture(&mut grid);
        assert!(tracker.compute_damage(&mut snapshot, 0, 0).is_empty());
    }

    #[test]
    fn test_idle_tick_does_not_commit() {
        let mut grid = blank_grid(4, 1);
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = settled(&mut grid, &mut tracker);
        let before = snapshot.previous().to_vec();

        snapshot.capture(&mut grid);
        tracker.compute_damage(&mut snapshot, 0, 0);
        assert_eq!(snapshot.previous(), &before[..]);
    }

    #[test]
    fn test_cursor_move_damages_old_and_new() {
        let mut grid = blank_grid(10, 2);
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = settled(&mut grid, &mut tracker);

        snapshot.capture(&mut grid);
        let damage = tracker.compute_damage(&mut snapshot, 4, 1);
        assert_eq!(damage, vec![DamagePoint::new(0, 0), DamagePoint::new(4, 1)]);
        assert_eq!(tracker.cursor().x, 4);
        assert_eq!(tracker.cursor().y, 1);
    }

    #[test]
    fn test_blink_toggles_every_rate_ticks() {
        let mut grid = blank_grid(3, 1);
        let mut tracker = DamageTracker::new(3);
        let mut snapshot = settled(&mut grid, &mut tracker);
        assert_eq!(tracker.cursor().phase(), BlinkPhase::Visible);

        let mut phases = Vec::new();
        for _ in 0..6 {
            snapshot.capture(&mut grid);
            let damage = tracker.compute_damage(&mut snapshot, 0, 0);
            phases.push((damage.len(), tracker.cursor().phase()));
        }
        assert_eq!(
            phases,
            vec![
                (0, BlinkPhase::Visible),
                (0, BlinkPhase::Visible),
                (1, BlinkPhase::Hidden),
                (0, BlinkPhase::Hidden),
                (0, BlinkPhase::Hidden),
                (1, BlinkPhase::Visible),
            ]
        );
    }

    #[test]
    fn test_zero_blink_rate_acts_as_one() {
        let mut tracker = DamageTracker::new(0);
        let mut grid = blank_grid(2, 1);
        let mut snapshot = SnapshotBuffer::new();
        snapshot.capture(&mut grid);
        for expected in [true, false, true] {
            tracker.compute_damage(&mut snapshot, 0, 0);
            assert_eq!(tracker.cursor().visible, expected);
            assert_eq!(tracker.cursor().blink_countdown, 1);
        }
    }

    #[test]
    fn test_out_of_range_cursor_is_reported() {
        let mut grid = blank_grid(4, 2);
        let mut tracker = DamageTracker::new(5);
        let mut snapshot = settled(&mut grid, &mut tracker);

        snapshot.capture(&mut grid);
        let damage = tracker.compute_damage(&mut snapshot, -1, 7);
        assert_eq!(damage.last(), Some(&DamagePoint::new(-1, 7)));
    }

    proptest! {
        #[test]
        fn prop_changed_cells_then_cursor(
            changes in proptest::collection::btree_set(0usize..40, 0..12),
            rate in 6u32..20,
        ) {
            let mut grid = blank_grid(8, 5);
            let mut tracker = DamageTracker::new(rate);
            let mut snapshot = settled(&mut grid, &mut tracker);

            for index in &changes {
                grid.put(index % 8, index / 8, Cell::new('#', 2, 4));
            }
            snapshot.capture(&mut grid);
            let damage = tracker.compute_damage(&mut snapshot, 0, 0);

            let mut expected: Vec<DamagePoint> = changes
                .iter()
                .map(|i| DamagePoint::new((i % 8) as i32, (i / 8) as i32))
                .collect();
            if !expected.is_empty() {
                expected.push(DamagePoint::new(0, 0));
            }
            prop_assert_eq!(damage, expected);
        }

        #[test]
        fn prop_blink_period_ignores_text(rate in 1u32..8, ticks in 1usize..60, seed in any::<u64>()) {
            let mut grid = blank_grid(6, 2);
            let mut tracker = DamageTracker::new(rate);
            let mut snapshot = settled(&mut grid, &mut tracker);

            let mut toggles = 0;
            let mut last = tracker.cursor().visible;
            for tick in 0..ticks {
                if (seed >> (tick % 64)) & 1 == 1 {
                    grid.put(tick % 6, 1, Cell::new(char::from(b'a' + (tick % 26) as u8), 7, 0));
                }
                snapshot.capture(&mut grid);
                tracker.compute_damage(&mut snapshot, 0, 0);
                if tracker.cursor().visible != last {
                    toggles += 1;
                    last = tracker.cursor().visible;
                }
            }
            prop_assert_eq!(toggles, ticks / rate as usize);
        }
    }
}
