//! Pixel canvas
//!
//! Plain RGB pixel storage with the handful of operations the compositor
//! needs: rectangle fills (opaque or alpha-blended) and rectangle copies.

use serde::{Deserialize, Serialize};

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` value
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// `self` drawn over `below` with opacity `alpha` (0 = invisible, 255 = opaque)
    pub fn over(self, below: Rgb, alpha: u8) -> Rgb {
        let a = alpha as u32;
        let mix = |top: u8, bottom: u8| -> u8 {
            ((top as u32 * a + bottom as u32 * (255 - a) + 127) / 255) as u8
        };
        Rgb {
            r: mix(self.r, below.r),
            g: mix(self.g, below.g),
            b: mix(self.b, below.b),
        }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Axis-aligned pixel rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlap of two rectangles (empty if disjoint)
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return PixelRect::new(x, y, 0, 0);
        }
        PixelRect::new(x, y, right - x, bottom - y)
    }
}

/// Owned RGB pixel buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    /// Build from row-major pixels; `None` when the length does not match
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Opaque fill, clipped to the canvas
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgb) {
        let rect = rect.intersect(&self.bounds());
        for y in rect.y..rect.bottom() {
            let row = (y * self.width) as usize;
            self.pixels[row + rect.x as usize..row + rect.right() as usize].fill(color);
        }
    }

    /// Alpha-blended fill, clipped to the canvas
    pub fn blend_rect(&mut self, rect: PixelRect, color: Rgb, alpha: u8) {
        match alpha {
            0 => {}
            255 => self.fill_rect(rect, color),
            _ => {
                let rect = rect.intersect(&self.bounds());
                for y in rect.y..rect.bottom() {
                    let row = (y * self.width) as usize;
                    for pixel in &mut self.pixels[row + rect.x as usize..row + rect.right() as usize] {
                        *pixel = color.over(*pixel, alpha);
                    }
                }
            }
        }
    }

    /// Copy `src_rect` of `src` to `(dest_x, dest_y)`, clipped on both sides
    pub fn copy_from(&mut self, src: &Canvas, src_rect: PixelRect, dest_x: u32, dest_y: u32) {
        let src_rect = src_rect.intersect(&src.bounds());
        let dest = PixelRect::new(dest_x, dest_y, src_rect.width, src_rect.height)
            .intersect(&self.bounds());
        if dest.is_empty() {
            return;
        }
        for row in 0..dest.height {
            let sy = src_rect.y + row;
            let dy = dest.y + row;
            let s = (sy * src.width + src_rect.x) as usize;
            let d = (dy * self.width + dest.x) as usize;
            self.pixels[d..d + dest.width as usize]
                .copy_from_slice(&src.pixels[s..s + dest.width as usize]);
        }
    }

    /// Copy the same rectangle from `src` into this canvas
    pub fn restore_from(&mut self, src: &Canvas, rect: PixelRect) {
        self.copy_from(src, rect, rect.x, rect.y);
    }
}
