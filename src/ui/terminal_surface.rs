//! Terminal preview surface using crossterm
//!
//! Keeps the composed pixel frame and shows it in the terminal with half-block
//! characters: each character cell carries two vertically stacked pixels, the
//! upper one as foreground color and the lower one as background color. Large
//! frames are sampled down by an integer step so they fit the terminal.

use std::collections::BTreeSet;
use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle,
    },
};
use tracing::debug;

use crate::render::canvas::{Canvas, PixelRect, Rgb};
use crate::render::compositor::Surface;

const HALF_BLOCK: char = '▀';

/// Surface presenting the frame in a terminal
pub struct TerminalSurface<W: Write = Stdout> {
    out: W,
    frame: Canvas,
    cols: u16,
    rows: u16,
    /// Frame pixels per terminal column (and per half row)
    step: u32,
    /// Terminal rows touched since the last present
    dirty_rows: BTreeSet<u16>,
    initialized: bool,
}

impl TerminalSurface<Stdout> {
    /// Surface on stdout sized to the current terminal
    pub fn stdout() -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::new(io::stdout(), cols, rows))
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            frame: Canvas::new(0, 0, Rgb::BLACK),
            cols: cols.max(1),
            rows: rows.max(1),
            step: 1,
            dirty_rows: BTreeSet::new(),
            initialized: false,
        }
    }

    /// Switch the terminal to raw mode on the alternate screen with mouse capture
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.out,
            EnterAlternateScreen,
            EnableMouseCapture,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let _ = execute!(
            self.out,
            ResetColor,
            Show,
            EnableLineWrap,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.out.flush();

        terminal::disable_raw_mode()
    }

    pub fn frame(&self) -> &Canvas {
        &self.frame
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Terminal was resized
    pub fn set_terminal_size(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self.rescale();
        if self.initialized {
            execute!(self.out, ResetColor, Clear(ClearType::All))?;
        }
        Ok(())
    }

    /// Resize the frame to `width` x `height` pixels, keeping the overlapping contents
    pub fn resize_frame(&mut self, width: u32, height: u32) {
        if self.frame.width() == width && self.frame.height() == height {
            return;
        }
        let mut frame = Canvas::new(width, height, Rgb::BLACK);
        frame.copy_from(&self.frame, self.frame.bounds(), 0, 0);
        self.frame = frame;
        self.rescale();
    }

    fn rescale(&mut self) {
        let by_width = self.frame.width().div_ceil(self.cols as u32);
        let by_height = self.frame.height().div_ceil(self.rows as u32 * 2);
        self.step = by_width.max(by_height).max(1);
        debug!(
            "Preview scale: frame {}x{} on {}x{} terminal, step {}",
            self.frame.width(),
            self.frame.height(),
            self.cols,
            self.rows,
            self.step
        );
        self.dirty_rows = (0..self.rows).collect();
    }

    /// Frame pixel under the center of terminal cell `(col, row)`
    pub fn to_pixel(&self, col: u16, row: u16) -> (f32, f32) {
        let step = self.step as f32;
        (
            col as f32 * step + step / 2.0,
            row as f32 * step * 2.0 + step,
        )
    }

    /// Rows visible in the terminal that show part of the frame
    fn visible_rows(&self) -> u16 {
        let rows = self.frame.height().div_ceil(self.step * 2);
        rows.min(self.rows as u32) as u16
    }

    fn visible_cols(&self) -> u16 {
        let cols = self.frame.width().div_ceil(self.step);
        cols.min(self.cols as u32) as u16
    }

    fn write_row(&mut self, row: u16) -> io::Result<()> {
        let step = self.step;
        let mut last: Option<(Rgb, Rgb)> = None;
        queue!(self.out, MoveTo(0, row))?;
        for col in 0..self.visible_cols() {
            let x = col as u32 * step;
            let top = self.frame.pixel(x, row as u32 * step * 2).unwrap_or_default();
            let bottom = self
                .frame
                .pixel(x, row as u32 * step * 2 + step)
                .unwrap_or_default();
            if last != Some((top, bottom)) {
                queue!(
                    self.out,
                    SetForegroundColor(top.to_crossterm()),
                    SetBackgroundColor(bottom.to_crossterm())
                )?;
                last = Some((top, bottom));
            }
            queue!(self.out, Print(HALF_BLOCK))?;
        }
        Ok(())
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn blit(&mut self, src: &Canvas, src_rect: PixelRect, dest_x: u32, dest_y: u32) -> io::Result<()> {
        let right = dest_x + src_rect.width;
        let bottom = dest_y + src_rect.height;
        if right > self.frame.width() || bottom > self.frame.height() {
            self.resize_frame(right.max(self.frame.width()), bottom.max(self.frame.height()));
        }
        self.frame.copy_from(src, src_rect, dest_x, dest_y);

        if src_rect.height > 0 {
            let first = dest_y / (self.step * 2);
            let last = (bottom - 1) / (self.step * 2);
            let limit = self.rows as u32;
            self.dirty_rows
                .extend((first..=last).filter(|r| *r < limit).map(|r| r as u16));
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        execute!(self.out, SetTitle(title))
    }

    fn present(&mut self) -> io::Result<()> {
        if self.dirty_rows.is_empty() {
            return Ok(());
        }
        // Synchronized update
        write!(self.out, "\x1b[?2026h")?;
        let visible = self.visible_rows();
        let rows: Vec<u16> = std::mem::take(&mut self.dirty_rows)
            .into_iter()
            .filter(|r| *r < visible)
            .collect();
        for row in rows {
            self.write_row(row)?;
        }
        queue!(self.out, ResetColor)?;
        write!(self.out, "\x1b[?2026l")?;
        self.out.flush()
    }
}
