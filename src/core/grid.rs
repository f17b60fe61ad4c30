//! Grid source contract
//!
//! The mirror never talks to an OS console directly. Everything it knows about
//! the text it shows comes through [`GridSource`]: the visible window into a
//! taller logical buffer, the cells in that window, the cursor and the title.

use bitflags::bitflags;

/// Number of palette entries a cell attribute can address
pub const NUM_COLORS: usize = 16;

/// A single character cell as read from the grid source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Displayed character (`'\0'` for an empty cell)
    pub glyph: char,
    /// Foreground palette index (0..15)
    pub fore: u8,
    /// Background palette index (0..15)
    pub back: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: '\0',
            fore: 0,
            back: 0,
        }
    }
}

impl Cell {
    pub const fn new(glyph: char, fore: u8, back: u8) -> Self {
        Self { glyph, fore, back }
    }

    /// Build a cell from a console attribute word (low nibble fore, next nibble back)
    pub fn from_attributes(glyph: char, attributes: u16) -> Self {
        Self {
            glyph,
            fore: (attributes & 0x0f) as u8,
            back: ((attributes >> 4) & 0x0f) as u8,
        }
    }
}

/// Origin and size of the visible window into the logical buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportGeometry {
    pub origin_x: usize,
    pub origin_y: usize,
    pub width: usize,
    pub height: usize,
    pub buffer_width: usize,
    pub buffer_height: usize,
}

impl ViewportGeometry {
    /// Number of cells in the visible window
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Check if the visible window has the same size as `other`
    pub fn same_size(&self, other: &ViewportGeometry) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Rows the window can scroll through (`buffer_height - height`)
    pub fn scroll_range(&self) -> usize {
        self.buffer_height.saturating_sub(self.height)
    }

    /// Current scroll position as a fraction in `[0, 1]`
    pub fn scroll_fraction(&self) -> f32 {
        let range = self.scroll_range();
        if range == 0 {
            return 0.0;
        }
        (self.origin_y as f32 / range as f32).clamp(0.0, 1.0)
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }
}

bitflags! {
    /// Modifier state sent along with a key, using the console control-key bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ModifierMask: u32 {
        const LEFT_ALT  = 0x0002;
        const LEFT_CTRL = 0x0008;
        const SHIFT     = 0x0010;
    }
}

/// A key forwarded to the grid source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    /// Key pressed (`true`) or released (`false`)
    pub down: bool,
    /// Virtual-key code (0 when `ch` carries the key)
    pub virtual_key: u16,
    pub modifiers: ModifierMask,
    /// Translated character, if the key produced one
    pub ch: Option<char>,
}

impl KeyInput {
    /// A typed character
    pub fn char(ch: char) -> Self {
        Self {
            down: true,
            virtual_key: 0,
            modifiers: ModifierMask::empty(),
            ch: Some(ch),
        }
    }

    /// A virtual key transition
    pub fn key(down: bool, virtual_key: u16, modifiers: ModifierMask) -> Self {
        Self {
            down,
            virtual_key,
            modifiers,
            ch: None,
        }
    }
}

/// Provider of the character grid being mirrored.
///
/// Geometry accessors may return different values between calls when the
/// source is resized externally; the snapshot buffer detects that.
pub trait GridSource {
    /// Visible window width in cells
    fn width(&self) -> usize;
    /// Visible window height in cells
    fn height(&self) -> usize;
    fn buffer_width(&self) -> usize;
    fn buffer_height(&self) -> usize;
    fn view_origin_x(&self) -> usize;
    fn view_origin_y(&self) -> usize;

    /// Cell at a window-relative position
    fn cell_at(&self, x: usize, y: usize) -> Cell;

    /// Cursor column relative to the visible window (may be out of range)
    fn cursor_x(&self) -> i32;
    /// Cursor row relative to the visible window (may be out of range)
    fn cursor_y(&self) -> i32;

    fn title(&self) -> String;

    /// Move the visible window so that `top_row` is its first row
    fn request_scroll_to(&mut self, top_row: usize);

    fn send_key(&mut self, key: KeyInput);

    /// Pull the source's current state before a capture.
    ///
    /// Sources that read lazily can ignore this.
    fn refresh(&mut self) {}

    /// All geometry accessors in one value
    fn geometry(&self) -> ViewportGeometry {
        ViewportGeometry {
            origin_x: self.view_origin_x(),
            origin_y: self.view_origin_y(),
            width: self.width(),
            height: self.height(),
            buffer_width: self.buffer_width(),
            buffer_height: self.buffer_height().max(self.height()),
        }
    }
}
