//! Pixel composition.
//!
//! Turns captured character grids into pixels over a background layer:
//!
//! - **canvas**: RGB pixel buffers, rectangle fills and copies
//! - **palette**: 16-color console palette and cursor colors
//! - **glyph**: Cell metrics and glyph rasterization
//! - **background**: Backdrop layer behind the window (wallpaper or blank)
//! - **compositor**: Full and patch redraws, scrollbar thumb
//!
//! # Layers
//!
//! ```text
//! Surface
//! ├── canvas (text area, persistent between redraws)
//! │   └── background layer + translucent cell fills + glyphs
//! └── gutter (scrollbar)
//!     └── background layer + thumb
//! ```

pub mod background;
pub mod canvas;
pub mod compositor;
pub mod glyph;
pub mod palette;

pub use background::{BackgroundProvider, BlankBackground, ImageBackground, ScreenRect, WallpaperStyle};
pub use canvas::{Canvas, PixelRect, Rgb};
pub use compositor::{Compositor, CompositorOptions, MemorySurface, RedrawMetrics, RedrawMode, Surface};
pub use glyph::{BlockGlyphs, CellMetrics, GlyphRasterizer};
pub use palette::Palette;
