//! Background layer
//!
//! The translucent look comes from painting cells over a bitmap of whatever
//! sits behind the window. Providers hand out that bitmap for a given screen
//! rectangle; where no backdrop is configured they return a neutral fill.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::canvas::{Canvas, Rgb};

#[derive(Error, Debug)]
pub enum BackgroundError {
    #[error("Failed to read background image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported background image: {0}")]
    Format(String),
}

/// Window client area in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Supplies the backdrop bitmap for a screen rectangle.
///
/// The returned canvas must be exactly `target.width` x `target.height`.
pub trait BackgroundProvider {
    fn background(&mut self, target: ScreenRect) -> Canvas;
}

/// Solid neutral backdrop
#[derive(Clone, Copy, Debug, Default)]
pub struct BlankBackground {
    color: Rgb,
}

impl BlankBackground {
    pub fn new(color: Rgb) -> Self {
        Self { color }
    }
}

impl BackgroundProvider for BlankBackground {
    fn background(&mut self, target: ScreenRect) -> Canvas {
        Canvas::new(target.width, target.height, self.color)
    }
}

/// How the wallpaper covers the screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperStyle {
    #[default]
    Stretched,
    Centered,
    Tiled,
}

/// Backdrop cut from a wallpaper image laid out over the whole screen
pub struct ImageBackground {
    image: Option<Canvas>,
    style: WallpaperStyle,
    screen_width: u32,
    screen_height: u32,
    neutral: Rgb,
}

impl ImageBackground {
    pub fn new(
        image: Option<Canvas>,
        style: WallpaperStyle,
        screen_width: u32,
        screen_height: u32,
        neutral: Rgb,
    ) -> Self {
        Self {
            image,
            style,
            screen_width: screen_width.max(1),
            screen_height: screen_height.max(1),
            neutral,
        }
    }

    /// Load a PPM wallpaper; a missing or unreadable file leaves the backdrop blank
    pub fn open(
        path: &Path,
        style: WallpaperStyle,
        screen_width: u32,
        screen_height: u32,
        neutral: Rgb,
    ) -> Self {
        let image = match load_ppm(path) {
            Ok(image) => {
                info!(
                    "Loaded background {} ({}x{})",
                    path.display(),
                    image.width(),
                    image.height()
                );
                Some(image)
            }
            Err(e) => {
                warn!("Background {} unavailable: {}", path.display(), e);
                None
            }
        };
        Self::new(image, style, screen_width, screen_height, neutral)
    }

    /// Wallpaper pixel shown at screen position `(sx, sy)`
    fn sample(&self, image: &Canvas, sx: i64, sy: i64) -> Rgb {
        let (iw, ih) = (image.width() as i64, image.height() as i64);
        let (sw, sh) = (self.screen_width as i64, self.screen_height as i64);
        if iw == 0 || ih == 0 {
            return self.neutral;
        }
        let (ix, iy) = match self.style {
            WallpaperStyle::Stretched => {
                if sx < 0 || sy < 0 || sx >= sw || sy >= sh {
                    return self.neutral;
                }
                (sx * iw / sw, sy * ih / sh)
            }
            WallpaperStyle::Centered => (sx - (sw - iw) / 2, sy - (sh - ih) / 2),
            WallpaperStyle::Tiled => (sx.rem_euclid(iw), sy.rem_euclid(ih)),
        };
        if ix < 0 || iy < 0 {
            return self.neutral;
        }
        image.pixel(ix as u32, iy as u32).unwrap_or(self.neutral)
    }
}

impl BackgroundProvider for ImageBackground {
    fn background(&mut self, target: ScreenRect) -> Canvas {
        let mut out = Canvas::new(target.width, target.height, self.neutral);
        let Some(image) = self.image.as_ref() else {
            return out;
        };
        for py in 0..target.height {
            for px in 0..target.width {
                let color = self.sample(image, target.x as i64 + px as i64, target.y as i64 + py as i64);
                out.set_pixel(px, py, color);
            }
        }
        out
    }
}

/// Read a PPM (P3 or P6) image from disk
pub fn load_ppm(path: &Path) -> Result<Canvas, BackgroundError> {
    let bytes = fs::read(path)?;
    decode_ppm(&bytes)
}

/// Decode a PPM (P3 or P6) image with a maximum sample value up to 255
pub fn decode_ppm(bytes: &[u8]) -> Result<Canvas, BackgroundError> {
    let mut pos = 0;
    let magic = next_token(bytes, &mut pos).ok_or_else(|| format_err("empty file"))?;
    let binary = match magic {
        b"P6" => true,
        b"P3" => false,
        _ => return Err(format_err("not a P3/P6 PPM image")),
    };
    let width = next_number(bytes, &mut pos)?;
    let height = next_number(bytes, &mut pos)?;
    let max = next_number(bytes, &mut pos)?;
    if max == 0 || max > 255 {
        return Err(format_err(&format!("unsupported max value {}", max)));
    }

    let samples = (width as usize)
        .checked_mul(height as usize)
        .and_then(|count| count.checked_mul(3))
        .ok_or_else(|| format_err("image dimensions too large"))?;
    let count = samples / 3;
    // Exactly one whitespace byte separates the header from binary samples
    let start = pos + 1;
    let remaining = bytes.len().saturating_sub(start);
    // ASCII samples take at least one digit and one separator each
    let needed = if binary {
        samples
    } else {
        (samples * 2).saturating_sub(1)
    };
    if remaining < needed {
        return Err(format_err(&format!(
            "truncated pixel data: {}x{} needs {} bytes, {} left",
            width, height, needed, remaining
        )));
    }

    let scale = |v: u32| -> u8 { ((v.min(max) * 255 + max / 2) / max) as u8 };
    let mut pixels = Vec::with_capacity(count);

    if binary {
        let data = &bytes[start..start + samples];
        for rgb in data.chunks_exact(3) {
            pixels.push(Rgb::new(
                scale(rgb[0] as u32),
                scale(rgb[1] as u32),
                scale(rgb[2] as u32),
            ));
        }
    } else {
        for _ in 0..count {
            let r = next_number(bytes, &mut pos)?;
            let g = next_number(bytes, &mut pos)?;
            let b = next_number(bytes, &mut pos)?;
            pixels.push(Rgb::new(scale(r), scale(g), scale(b)));
        }
    }

    Canvas::from_pixels(width, height, pixels).ok_or_else(|| format_err("pixel count mismatch"))
}

/// Encode a canvas as a binary PPM (P6) image
pub fn encode_ppm(canvas: &Canvas) -> Vec<u8> {
    let mut out = format!("P6\n{} {}\n255\n", canvas.width(), canvas.height()).into_bytes();
    out.reserve(canvas.pixels().len() * 3);
    for pixel in canvas.pixels() {
        out.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
    }
    out
}

/// Write a canvas to disk as a binary PPM image
pub fn save_ppm(canvas: &Canvas, path: &Path) -> Result<(), BackgroundError> {
    fs::write(path, encode_ppm(canvas))?;
    Ok(())
}

fn format_err(msg: &str) -> BackgroundError {
    BackgroundError::Format(msg.to_string())
}

/// Next whitespace-separated token, skipping `#` comments
fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        None
    } else {
        Some(&bytes[start..*pos])
    }
}

fn next_number(bytes: &[u8], pos: &mut usize) -> Result<u32, BackgroundError> {
    let token = next_token(bytes, pos).ok_or_else(|| format_err("truncated header"))?;
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format_err("invalid number"))
}
