//! Host-side input and presentation.
//!
//! - **keymapper**: Host key events to console key input
//! - **terminal_surface**: Half-block preview of the composed frame in the terminal

pub mod keymapper;
pub mod terminal_surface;

pub use keymapper::KeyMapper;
pub use terminal_surface::TerminalSurface;
