// One error type for the whole crate.
// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A full-canvas pixel buffer could not be reserved (or its size overflows).
    #[error("Allocation error: cannot reserve a {width}x{height} pixel buffer")]
    Allocation { width: usize, height: usize },

    /// Decoding a brush tip image failed.
    #[error("Brush image error: {0}")]
    BrushImage(#[from] image::ImageError),

    /// The brush tip image decoded fine but has no pixels.
    #[error("Brush image error: image has zero area")]
    EmptyBrushImage,

    /// Reading or parsing dabble.toml failed.
    #[error("Config error: {0}")]
    Config(String),

    /// Creating the window failed
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),
}
