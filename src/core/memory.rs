//! In-memory grid source
//!
//! A tall character buffer with a movable visible window and a simple
//! local-echo line discipline. Used by the demo host and throughout the tests.

use unicode_width::UnicodeWidthChar;

use super::grid::{Cell, GridSource, KeyInput};

const VK_LEFT: u16 = 0x25;
const VK_UP: u16 = 0x26;
const VK_RIGHT: u16 = 0x27;
const VK_DOWN: u16 = 0x28;

/// Grid source backed by a `Vec<Cell>`
pub struct MemoryGrid {
    width: usize,
    height: usize,
    buffer_height: usize,
    cells: Vec<Cell>,
    origin_y: usize,
    /// Cursor in buffer coordinates (column, row)
    cursor: (usize, usize),
    pen: (u8, u8),
    title: String,
}

impl MemoryGrid {
    /// Create a `width` x `height` window over a buffer of `buffer_height` rows
    pub fn new(width: usize, height: usize, buffer_height: usize) -> Self {
        let buffer_height = buffer_height.max(height);
        Self {
            width,
            height,
            buffer_height,
            cells: vec![Self::blank(); width * buffer_height],
            origin_y: 0,
            cursor: (0, 0),
            pen: (7, 0),
            title: String::from("glasscon"),
        }
    }

    fn blank() -> Cell {
        Cell::new(' ', 7, 0)
    }

    /// Overwrite a cell at a window-relative position
    pub fn put(&mut self, x: usize, y: usize, cell: Cell) {
        let row = self.origin_y + y;
        if x < self.width && row < self.buffer_height {
            self.cells[row * self.width + x] = cell;
        }
    }

    /// Overwrite every cell in the buffer
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Colors used for echoed text
    pub fn set_pen(&mut self, fore: u8, back: u8) {
        self.pen = (fore & 0x0f, back & 0x0f);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Place the cursor at a window-relative position
    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor = (
            x.min(self.width.saturating_sub(1)),
            (self.origin_y + y).min(self.buffer_height.saturating_sub(1)),
        );
    }

    /// Change the visible window size, keeping the buffer contents that still fit
    pub fn resize_view(&mut self, width: usize, height: usize) {
        let buffer_height = self.buffer_height.max(height);
        let mut cells = vec![Self::blank(); width * buffer_height];
        for row in 0..self.buffer_height.min(buffer_height) {
            for col in 0..self.width.min(width) {
                cells[row * width + col] = self.cells[row * self.width + col];
            }
        }
        self.cells = cells;
        self.width = width;
        self.height = height;
        self.buffer_height = buffer_height;
        self.origin_y = self.origin_y.min(buffer_height - height);
        self.cursor = (
            self.cursor.0.min(width.saturating_sub(1)),
            self.cursor.1.min(buffer_height.saturating_sub(1)),
        );
    }

    /// Echo a string at the cursor with the current pen
    pub fn write_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.echo(ch);
        }
    }

    fn echo(&mut self, ch: char) {
        match ch {
            '\r' | '\n' => self.newline(),
            '\u{8}' => self.backspace(),
            '\t' => {
                let next = (self.cursor.0 / 8 + 1) * 8;
                while self.cursor.0 < next.min(self.width) {
                    self.print(' ');
                }
            }
            c if c.is_control() => {}
            c => self.print(c),
        }
    }

    fn print(&mut self, ch: char) {
        let width = ch.width().unwrap_or(0);
        if width == 0 || self.width == 0 {
            return;
        }
        if self.cursor.0 + width > self.width {
            self.newline();
        }
        let (fore, back) = self.pen;
        let index = self.cursor.1 * self.width + self.cursor.0;
        self.cells[index] = Cell::new(ch, fore, back);
        // Wide glyphs own the next column too
        for pad in 1..width {
            if self.cursor.0 + pad < self.width {
                self.cells[index + pad] = Cell::new(' ', fore, back);
            }
        }
        self.cursor.0 += width;
        if self.cursor.0 >= self.width {
            self.newline();
        }
        self.follow_cursor();
    }

    fn newline(&mut self) {
        self.cursor.0 = 0;
        if self.cursor.1 + 1 < self.buffer_height {
            self.cursor.1 += 1;
        } else {
            // Buffer full: drop the oldest row
            self.cells.drain(..self.width);
            self.cells
                .extend(std::iter::repeat(Self::blank()).take(self.width));
        }
        self.follow_cursor();
    }

    fn backspace(&mut self) {
        if self.cursor.0 > 0 {
            self.cursor.0 -= 1;
            let index = self.cursor.1 * self.width + self.cursor.0;
            self.cells[index] = Self::blank();
        }
    }

    /// Scroll the window so the cursor row is visible
    fn follow_cursor(&mut self) {
        let row = self.cursor.1;
        if row < self.origin_y {
            self.origin_y = row;
        } else if row >= self.origin_y + self.height {
            self.origin_y = row + 1 - self.height;
        }
    }
}

impl GridSource for MemoryGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn buffer_width(&self) -> usize {
        self.width
    }

    fn buffer_height(&self) -> usize {
        self.buffer_height
    }

    fn view_origin_x(&self) -> usize {
        0
    }

    fn view_origin_y(&self) -> usize {
        self.origin_y
    }

    fn cell_at(&self, x: usize, y: usize) -> Cell {
        if x >= self.width || y >= self.height {
            return Cell::default();
        }
        self.cells
            .get((self.origin_y + y) * self.width + x)
            .copied()
            .unwrap_or_default()
    }

    fn cursor_x(&self) -> i32 {
        self.cursor.0 as i32
    }

    fn cursor_y(&self) -> i32 {
        self.cursor.1 as i32 - self.origin_y as i32
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn request_scroll_to(&mut self, top_row: usize) {
        self.origin_y = top_row.min(self.buffer_height - self.height);
    }

    fn send_key(&mut self, key: KeyInput) {
        if !key.down {
            return;
        }
        if let Some(ch) = key.ch {
            self.echo(ch);
            return;
        }
        match key.virtual_key {
            VK_LEFT => self.cursor.0 = self.cursor.0.saturating_sub(1),
            VK_RIGHT => self.cursor.0 = (self.cursor.0 + 1).min(self.width.saturating_sub(1)),
            VK_UP => self.cursor.1 = self.cursor.1.saturating_sub(1),
            VK_DOWN => {
                self.cursor.1 = (self.cursor.1 + 1).min(self.buffer_height.saturating_sub(1))
            }
            _ => {}
        }
        self.follow_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::ModifierMask;

    fn text_row(grid: &MemoryGrid, y: usize) -> String {
        (0..grid.width()).map(|x| grid.cell_at(x, y).glyph).collect()
    }

    #[test]
    fn test_echo_and_newline() {
        let mut grid = MemoryGrid::new(6, 2, 2);
        grid.write_str("ab\ncd");
        assert_eq!(text_row(&grid, 0), "ab    ");
        assert_eq!(text_row(&grid, 1), "cd    ");
        assert_eq!((grid.cursor_x(), grid.cursor_y()), (2, 1));
    }

    #[test]
    fn test_echo_uses_pen() {
        let mut grid = MemoryGrid::new(4, 1, 1);
        grid.set_pen(14, 1);
        grid.write_str("x");
        assert_eq!(grid.cell_at(0, 0), Cell::new('x', 14, 1));
    }

    #[test]
    fn test_window_follows_cursor() {
        let mut grid = MemoryGrid::new(4, 2, 10);
        grid.write_str("1\n2\n3\n4");
        assert_eq!(grid.view_origin_y(), 2);
        assert_eq!(text_row(&grid, 0), "3   ");
        assert_eq!(grid.cursor_y(), 1);
    }

    #[test]
    fn test_full_buffer_drops_oldest_row() {
        let mut grid = MemoryGrid::new(3, 2, 2);
        grid.write_str("a\nb\nc");
        assert_eq!(text_row(&grid, 0), "b  ");
        assert_eq!(text_row(&grid, 1), "c  ");
    }

    #[test]
    fn test_backspace_key() {
        let mut grid = MemoryGrid::new(4, 1, 1);
        grid.send_key(KeyInput::char('q'));
        grid.send_key(KeyInput::char('\u{8}'));
        assert_eq!(text_row(&grid, 0), "    ");
        assert_eq!(grid.cursor_x(), 0);
    }

    #[test]
    fn test_key_up_is_ignored() {
        let mut grid = MemoryGrid::new(4, 1, 1);
        grid.send_key(KeyInput {
            down: false,
            ..KeyInput::char('q')
        });
        grid.send_key(KeyInput::key(true, VK_RIGHT, ModifierMask::empty()));
        assert_eq!(text_row(&grid, 0), "    ");
        assert_eq!(grid.cursor_x(), 1);
    }

    #[test]
    fn test_scroll_request_is_clamped() {
        let mut grid = MemoryGrid::new(4, 5, 20);
        grid.request_scroll_to(100);
        assert_eq!(grid.view_origin_y(), 15);
        assert_eq!(grid.cursor_y(), -15);
    }

    #[test]
    fn test_wide_glyph_takes_two_columns() {
        let mut grid = MemoryGrid::new(4, 1, 1);
        grid.write_str("界a");
        assert_eq!(text_row(&grid, 0), "界 a ");
        assert_eq!(grid.cursor_x(), 3);
    }

    #[test]
    fn test_resize_keeps_contents() {
        let mut grid = MemoryGrid::new(4, 2, 2);
        grid.write_str("abcd");
        grid.resize_view(6, 3);
        assert_eq!(grid.width(), 6);
        assert_eq!(grid.buffer_height(), 3);
        assert_eq!(text_row(&grid, 0), "abcd  ");
    }
}
