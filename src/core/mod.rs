//! Grid capture and change tracking.
//!
//! This module contains the rendering-independent logic:
//!
//! - **grid**: Cell type and the `GridSource` trait for mirrored consoles
//! - **snapshot**: Double-buffered current/previous grids
//! - **damage**: Cell diffing and cursor blink state
//! - **scroll**: Scrollbar thumb geometry and click mapping
//! - **memory**: In-memory grid source (demo mode, tests)
//! - **console**: Windows console screen buffer source
//!
//! # Architecture
//!
//! ```text
//! GridSource (ConsoleGrid | MemoryGrid)
//! └── SnapshotBuffer (current + previous)
//!     └── DamageTracker (diff + CursorState)
//! ```

pub mod damage;
pub mod grid;
pub mod memory;
pub mod scroll;
pub mod snapshot;

#[cfg(windows)]
pub mod console;

pub use damage::{BlinkPhase, CursorState, DamagePoint, DamageTracker};
pub use grid::{Cell, GridSource, KeyInput, ModifierMask, ViewportGeometry};
pub use memory::MemoryGrid;
pub use scroll::{ScrollMapper, ThumbRect};
pub use snapshot::SnapshotBuffer;
