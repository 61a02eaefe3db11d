//! Raster painting core: brush stamping, a layer stack, and per-layer
//! undo/redo that replays recorded strokes instead of storing bitmaps.
//!
//! The window shell lives in the `dabble` binary; everything here is
//! synchronous and owned by a single `Canvas`.

pub mod brush;
pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod pixels;
pub mod stamp;
pub mod stroke;

pub use brush::{BrushCatalog, BrushDescriptor, BrushPreset, StampImage};
pub use canvas::{Canvas, InputEvent};
pub use error::Error;
pub use geometry::Point;
pub use layer::Layer;
pub use pixels::{FrameBuffer, PixelBuffer, Rgb};
pub use stroke::StrokeRecord;
