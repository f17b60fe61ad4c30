//! Configuration and color scheme management for glasscon.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.glasscon/config.toml`
//! - Built-in console palettes (classic, campbell, vintage, one-half-dark)
//! - Conversion into the palette, cell metrics and options the mirror runs with
//!
//! # Configuration File
//!
//! ```toml
//! color_scheme = "campbell"
//! draw_alpha = 160
//!
//! [cursor]
//! fore = 0
//! back = 10
//! blink_rate = 5
//!
//! [font]
//! cell_width = 9
//! cell_height = 16
//! width_adjust = -2
//!
//! [render]
//! tick_ms = 100
//! patch_limit_divisor = 4
//! refresh_thumb_every_tick = true
//!
//! [background]
//! image = "C:/Users/me/wallpaper.ppm"
//! style = "tiled"
//! screen_width = 1920
//! screen_height = 1080
//! ```
//!
//! A `palette` array of 16 `{ r, g, b }` tables overrides the scheme.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::grid::NUM_COLORS;
use crate::engine::MirrorOptions;
use crate::render::background::{BackgroundProvider, BlankBackground, ImageBackground, WallpaperStyle};
use crate::render::canvas::Rgb;
use crate::render::compositor::CompositorOptions;
use crate::render::glyph::CellMetrics;
use crate::render::palette::Palette;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Palette must have 16 entries, found {0}")]
    PaletteLength(usize),

    #[error("Could not determine home directory")]
    NoHome,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Built-in palette name
    pub color_scheme: String,
    /// Opacity of cell background fills (0 = fully translucent)
    pub draw_alpha: u8,
    pub cursor: CursorConfig,
    pub font: FontConfig,
    pub render: RenderConfig,
    pub background: BackgroundConfig,
    /// Explicit palette, overrides `color_scheme`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<Rgb>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_scheme: "classic".to_string(),
            draw_alpha: 0xa0,
            cursor: CursorConfig::default(),
            font: FontConfig::default(),
            render: RenderConfig::default(),
            background: BackgroundConfig::default(),
            palette: None,
        }
    }
}

/// Cursor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Palette index of the glyph under the cursor
    pub fore: u8,
    /// Palette index of the cursor fill (also used for the scrollbar thumb)
    pub back: u8,
    /// Ticks between blink toggles
    pub blink_rate: u32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            fore: 0,
            back: 10,
            blink_rate: 5,
        }
    }
}

/// Font metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub cell_width: u32,
    pub cell_height: u32,
    /// Pixel correction added to the measured cell width
    pub width_adjust: i32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            cell_width: 9,
            cell_height: 16,
            width_adjust: -2,
        }
    }
}

/// Redraw loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Full redraw once damage exceeds `width / patch_limit_divisor` cells
    pub patch_limit_divisor: usize,
    pub refresh_thumb_every_tick: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            patch_limit_divisor: 4,
            refresh_thumb_every_tick: true,
        }
    }
}

/// Backdrop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// PPM wallpaper; none means a plain neutral backdrop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    pub style: WallpaperStyle,
    pub screen_width: u32,
    pub screen_height: u32,
    pub neutral: Rgb,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            image: None,
            style: WallpaperStyle::Stretched,
            screen_width: 1920,
            screen_height: 1080,
            neutral: Rgb::BLACK,
        }
    }
}

impl Config {
    /// Load configuration from `~/.glasscon/config.toml`, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_or_default(&path),
            _ => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Using default config, {} is invalid: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load and validate configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        if let Some(palette) = &config.palette {
            if palette.len() != NUM_COLORS {
                return Err(ConfigError::PaletteLength(palette.len()));
            }
        }
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Write the default configuration unless a file already exists
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save_to(&path)?;
            info!("Wrote default config to {}", path.display());
        }
        Ok(path)
    }

    /// Directory holding the config file and the log
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        home_dir()
            .map(|home| home.join(".glasscon"))
            .ok_or(ConfigError::NoHome)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// Palette from the explicit list or the named scheme
    pub fn palette(&self) -> Palette {
        let colors = match self.palette.as_deref() {
            Some(list) if list.len() == NUM_COLORS => {
                let mut colors = [Rgb::BLACK; NUM_COLORS];
                colors.copy_from_slice(list);
                colors
            }
            _ => ColorScheme::by_name(&self.color_scheme).colors,
        };
        Palette::new(colors, self.cursor.fore, self.cursor.back, self.draw_alpha)
    }

    pub fn cell_metrics(&self) -> CellMetrics {
        CellMetrics::from_font(
            self.font.cell_width,
            self.font.cell_height,
            self.font.width_adjust,
        )
    }

    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            metrics: self.cell_metrics(),
            blink_rate: self.cursor.blink_rate,
            compositor: CompositorOptions {
                patch_limit_divisor: self.render.patch_limit_divisor,
                refresh_thumb_every_tick: self.render.refresh_thumb_every_tick,
            },
            window_origin: (0, 0),
        }
    }

    /// Backdrop provider for the configured wallpaper
    pub fn background_provider(&self) -> Box<dyn BackgroundProvider> {
        let bg = &self.background;
        match &bg.image {
            Some(path) => Box::new(ImageBackground::open(
                path,
                bg.style,
                bg.screen_width,
                bg.screen_height,
                bg.neutral,
            )),
            None => Box::new(BlankBackground::new(bg.neutral)),
        }
    }
}

/// Named 16-color console palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScheme {
    pub name: &'static str,
    pub colors: [Rgb; NUM_COLORS],
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::classic()
    }
}

impl ColorScheme {
    const fn from_table(name: &'static str, table: [u32; NUM_COLORS]) -> Self {
        let mut colors = [Rgb::BLACK; NUM_COLORS];
        let mut i = 0;
        while i < NUM_COLORS {
            colors[i] = Rgb::from_hex(table[i]);
            i += 1;
        }
        Self { name, colors }
    }

    /// The mirror's own palette
    pub fn classic() -> Self {
        Self::from_table(
            "classic",
            [
                0x000000, 0x0000b0, 0x00b000, 0x00b0b0, 0xb00000, 0xb000b0, 0xb0b000, 0xb0b0b0,
                0x404040, 0x4040ff, 0x40ff40, 0x40ffff, 0xff4040, 0xff40ff, 0xffff40, 0xffffff,
            ],
        )
    }

    /// Windows Terminal default
    pub fn campbell() -> Self {
        Self::from_table(
            "campbell",
            [
                0x0C0C0C, 0x0037DA, 0x13A10E, 0x3A96DD, 0xC50F1F, 0x881798, 0xC19C00, 0xCCCCCC,
                0x767676, 0x3B78FF, 0x16C60C, 0x61D6D6, 0xE74856, 0xB4009E, 0xF9F1A5, 0xF2F2F2,
            ],
        )
    }

    /// Legacy console colors
    pub fn vintage() -> Self {
        Self::from_table(
            "vintage",
            [
                0x000000, 0x000080, 0x008000, 0x008080, 0x800000, 0x800080, 0x808000, 0xC0C0C0,
                0x808080, 0x0000FF, 0x00FF00, 0x00FFFF, 0xFF0000, 0xFF00FF, 0xFFFF00, 0xFFFFFF,
            ],
        )
    }

    pub fn one_half_dark() -> Self {
        Self::from_table(
            "one-half-dark",
            [
                0x282C34, 0x61AFEF, 0x98C379, 0x56B6C2, 0xE06C75, 0xC678DD, 0xE5C07B, 0xDCDFE4,
                0x5A6374, 0x61AFEF, 0x98C379, 0x56B6C2, 0xE06C75, 0xC678DD, 0xE5C07B, 0xDCDFE4,
            ],
        )
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "campbell" => Self::campbell(),
            "vintage" => Self::vintage(),
            "one-half-dark" | "one_half_dark" | "onehalfdark" => Self::one_half_dark(),
            _ => Self::classic(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec!["classic", "campbell", "vintage", "one-half-dark"]
    }
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
