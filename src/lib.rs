//! glasscon - mirror a text console onto a translucent surface
//!
//! The console's character grid is polled every tick, diffed against the
//! previous tick, and composited over a background layer. Small changes are
//! patched cell by cell; large ones repaint the whole frame.
//!
//! # Modules
//!
//! - **core**: Grid sources, snapshots, damage tracking, scrollbar mapping
//! - **render**: Pixel canvas, palette, glyphs, background layer, compositor
//! - **engine**: The tick driver tying them together
//! - **ui**: Key mapping and the terminal preview surface
//! - **config**: TOML configuration and built-in palettes

pub mod config;
pub mod core;
pub mod engine;
pub mod render;
pub mod ui;

pub use engine::{Mirror, MirrorOptions, TickOutcome};
