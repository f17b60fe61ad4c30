//! Windows console grid source
//!
//! Reads the visible window of the attached console screen buffer and feeds
//! keys back through the console input queue.

use thiserror::Error;
use tracing::{info, warn};

use windows::Win32::Foundation::{BOOL, HANDLE};
use windows::Win32::System::Console::{
    AllocConsole, FreeConsole, GetConsoleScreenBufferInfo, GetConsoleTitleW, GetStdHandle,
    ReadConsoleOutputW, SetConsoleWindowInfo, WriteConsoleInputW, CHAR_INFO,
    CONSOLE_SCREEN_BUFFER_INFO, COORD, INPUT_RECORD, INPUT_RECORD_0, KEY_EVENT, KEY_EVENT_RECORD,
    KEY_EVENT_RECORD_0, SMALL_RECT, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{MapVirtualKeyW, MAPVK_VK_TO_VSC};

use super::grid::{Cell, GridSource, KeyInput};

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Failed to allocate console: {0}")]
    Alloc(#[source] windows::core::Error),

    #[error("Failed to get console handle: {0}")]
    Handle(#[source] windows::core::Error),

    #[error("Failed to read console buffer: {0}")]
    Read(#[source] windows::core::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Grid source over the console this process is attached to
pub struct ConsoleGrid {
    output: HANDLE,
    input: HANDLE,
    info: CONSOLE_SCREEN_BUFFER_INFO,
    chars: Vec<CHAR_INFO>,
}

// Safety: console handles are process-wide and only used from the owning thread
unsafe impl Send for ConsoleGrid {}

impl ConsoleGrid {
    /// Detach from the current console, allocate a fresh one and mirror it
    pub fn allocate() -> Result<Self> {
        unsafe {
            let _ = FreeConsole();
            AllocConsole().map_err(ConsoleError::Alloc)?;
        }
        info!("Allocated console");
        Self::attached()
    }

    /// Mirror the console already attached to this process
    pub fn attached() -> Result<Self> {
        let (output, input) = unsafe {
            (
                GetStdHandle(STD_OUTPUT_HANDLE).map_err(ConsoleError::Handle)?,
                GetStdHandle(STD_INPUT_HANDLE).map_err(ConsoleError::Handle)?,
            )
        };
        let mut grid = Self {
            output,
            input,
            info: CONSOLE_SCREEN_BUFFER_INFO::default(),
            chars: Vec::new(),
        };
        grid.read()?;
        Ok(grid)
    }

    /// Re-read buffer info and the visible window
    fn read(&mut self) -> Result<()> {
        unsafe {
            GetConsoleScreenBufferInfo(self.output, &mut self.info).map_err(ConsoleError::Read)?;
        }
        let (width, height) = (self.width(), self.height());
        if self.chars.len() != width * height {
            self.chars = vec![CHAR_INFO::default(); width * height];
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut region = self.info.srWindow;
        unsafe {
            ReadConsoleOutputW(
                self.output,
                self.chars.as_mut_ptr(),
                COORD {
                    X: width as i16,
                    Y: height as i16,
                },
                COORD { X: 0, Y: 0 },
                &mut region,
            )
            .map_err(ConsoleError::Read)?;
        }
        Ok(())
    }

    fn write_records(&self, records: &[INPUT_RECORD]) {
        let mut written = 0u32;
        if let Err(e) = unsafe { WriteConsoleInputW(self.input, records, &mut written) } {
            warn!("WriteConsoleInputW failed: {}", e);
        }
    }

    fn key_record(down: bool, virtual_key: u16, unit: u16, control: u32) -> INPUT_RECORD {
        let scan = unsafe { MapVirtualKeyW(virtual_key as u32, MAPVK_VK_TO_VSC) } as u16;
        INPUT_RECORD {
            EventType: KEY_EVENT as u16,
            Event: INPUT_RECORD_0 {
                KeyEvent: KEY_EVENT_RECORD {
                    bKeyDown: BOOL::from(down),
                    wRepeatCount: 1,
                    wVirtualKeyCode: virtual_key,
                    wVirtualScanCode: scan,
                    uChar: KEY_EVENT_RECORD_0 { UnicodeChar: unit },
                    dwControlKeyState: control,
                },
            },
        }
    }
}

impl GridSource for ConsoleGrid {
    fn width(&self) -> usize {
        let window = self.info.srWindow;
        (window.Right - window.Left + 1).max(0) as usize
    }

    fn height(&self) -> usize {
        let window = self.info.srWindow;
        (window.Bottom - window.Top + 1).max(0) as usize
    }

    fn buffer_width(&self) -> usize {
        self.info.dwSize.X.max(0) as usize
    }

    fn buffer_height(&self) -> usize {
        self.info.dwSize.Y.max(0) as usize
    }

    fn view_origin_x(&self) -> usize {
        self.info.srWindow.Left.max(0) as usize
    }

    fn view_origin_y(&self) -> usize {
        self.info.srWindow.Top.max(0) as usize
    }

    fn cell_at(&self, x: usize, y: usize) -> Cell {
        let width = self.width();
        if x >= width || y >= self.height() {
            return Cell::default();
        }
        match self.chars.get(y * width + x) {
            Some(info) => {
                let unit = unsafe { info.Char.UnicodeChar };
                let glyph = char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                Cell::from_attributes(glyph, info.Attributes)
            }
            None => Cell::default(),
        }
    }

    fn cursor_x(&self) -> i32 {
        self.info.dwCursorPosition.X as i32 - self.info.srWindow.Left as i32
    }

    fn cursor_y(&self) -> i32 {
        self.info.dwCursorPosition.Y as i32 - self.info.srWindow.Top as i32
    }

    fn title(&self) -> String {
        let mut buf = [0u16; 512];
        let len = unsafe { GetConsoleTitleW(&mut buf) } as usize;
        String::from_utf16_lossy(&buf[..len.min(buf.len())])
    }

    fn request_scroll_to(&mut self, top_row: usize) {
        let height = self.height() as i16;
        let max_top = (self.info.dwSize.Y - height).max(0);
        let top = (top_row.min(i16::MAX as usize) as i16).min(max_top);
        let window = SMALL_RECT {
            Left: self.info.srWindow.Left,
            Top: top,
            Right: self.info.srWindow.Right,
            Bottom: top + height - 1,
        };
        if let Err(e) = unsafe { SetConsoleWindowInfo(self.output, BOOL::from(true), &window) } {
            warn!("SetConsoleWindowInfo failed: {}", e);
            return;
        }
        self.refresh();
    }

    fn send_key(&mut self, key: KeyInput) {
        let control = key.modifiers.bits();
        match key.ch {
            Some(ch) => {
                let mut units = [0u16; 2];
                let records: Vec<INPUT_RECORD> = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .flat_map(|unit| {
                        [
                            Self::key_record(true, key.virtual_key, *unit, control),
                            Self::key_record(false, key.virtual_key, *unit, control),
                        ]
                    })
                    .collect();
                self.write_records(&records);
            }
            None => {
                self.write_records(&[Self::key_record(key.down, key.virtual_key, 0, control)]);
            }
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = self.read() {
            warn!("Console refresh failed: {}", e);
        }
    }
}
