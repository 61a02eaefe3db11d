// Pixel storage used by layers, the compositor and the window.
// Layers hold premultiplied RGBA; the window wants opaque 0x00RRGGBB.

use crate::error::Error;
use serde::Deserialize;
use std::fmt;

/// One premultiplied RGBA pixel: [r, g, b, a], each colour channel <= a.
pub type Rgba = [u8; 4];

/// Fully transparent pixel.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// A straight (non-premultiplied) opaque colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Premultiply by `alpha` into a pixel ready for source-over.
    #[inline]
    pub fn with_alpha(self, alpha: u8) -> Rgba {
        [mul255(self.r, alpha), mul255(self.g, alpha), mul255(self.b, alpha), alpha]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

/// (a * b) / 255 with rounding, exact for the 0..=255 range.
#[inline]
pub fn mul255(a: u8, b: u8) -> u8 {
    let x = a as u32 * b as u32 + 128;
    ((x + (x >> 8)) >> 8) as u8
}

/// Source-over for premultiplied pixels: out = src + dst * (1 - src.a).
#[inline]
pub fn source_over(dst: Rgba, src: Rgba) -> Rgba {
    let inv = 255 - src[3];
    [
        src[0].saturating_add(mul255(dst[0], inv)),
        src[1].saturating_add(mul255(dst[1], inv)),
        src[2].saturating_add(mul255(dst[2], inv)),
        src[3].saturating_add(mul255(dst[3], inv)),
    ]
}

#[cfg(test)]
thread_local! {
    static FAIL_ALLOCATIONS: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Makes every buffer allocation on this thread fail until the guard drops.
#[cfg(test)]
pub(crate) struct FailAllocations;

#[cfg(test)]
impl FailAllocations {
    pub(crate) fn start() -> Self {
        FAIL_ALLOCATIONS.with(|f| f.set(true));
        Self
    }
}

#[cfg(test)]
impl Drop for FailAllocations {
    fn drop(&mut self) {
        FAIL_ALLOCATIONS.with(|f| f.set(false));
    }
}

#[cfg(test)]
fn allocations_fail() -> bool {
    FAIL_ALLOCATIONS.with(|f| f.get())
}

#[cfg(not(test))]
#[inline(always)]
fn allocations_fail() -> bool {
    false
}

/// Empty vec with room for `len` items, or `Error::Allocation`.
fn reserve<T>(len: usize, width: usize, height: usize) -> Result<Vec<T>, Error> {
    if allocations_fail() {
        return Err(Error::Allocation { width, height });
    }
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { width, height })?;
    Ok(v)
}

/// Reserve `width * height` slots without aborting on exhaustion.
fn alloc_filled<T: Copy>(width: usize, height: usize, fill: T) -> Result<Vec<T>, Error> {
    let len = width
        .checked_mul(height)
        .ok_or(Error::Allocation { width, height })?;
    let mut v = reserve(len, width, height)?;
    v.resize(len, fill);
    Ok(v)
}

/// Owned premultiplied RGBA raster with fixed dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>, // row-major, length = width * height
}

impl PixelBuffer {
    /// A fully transparent buffer. Fails only if the memory cannot be reserved.
    pub fn new(width: usize, height: usize) -> Result<Self, Error> {
        Ok(Self {
            width,
            height,
            pixels: alloc_filled(width, height, TRANSPARENT)?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Pixel at (x, y), or None outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Fallible deep copy (used for the pre-stroke snapshot).
    pub fn try_clone(&self) -> Result<Self, Error> {
        let mut pixels = reserve(self.pixels.len(), self.width, self.height)?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self { width: self.width, height: self.height, pixels })
    }

    /// Overwrite this buffer with `other`. Both must share dimensions.
    pub fn copy_from(&mut self, other: &PixelBuffer) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// True when every pixel has zero alpha.
    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p[3] == 0)
    }

    /// Number of pixels with non-zero alpha.
    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] != 0).count()
    }

    /// Source-over `src` onto (x, y). Out-of-bounds writes are ignored.
    #[inline]
    pub(crate) fn blend(&mut self, x: i32, y: i32, src: Rgba) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = source_over(self.pixels[idx], src);
        }
    }

    /// Set (x, y) fully transparent. Out-of-bounds writes are ignored.
    #[inline]
    pub(crate) fn clear_at(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = TRANSPARENT;
        }
    }

    /// Composite `layer` over this buffer, scaling the layer uniformly by `opacity`.
    pub(crate) fn composite(&mut self, layer: &PixelBuffer, opacity: f32) {
        debug_assert_eq!((self.width, self.height), (layer.width, layer.height));
        let scale = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        if scale == 0 {
            return;
        }
        for (dst, &src) in self.pixels.iter_mut().zip(&layer.pixels) {
            if src[3] == 0 {
                continue;
            }
            let src = if scale == 255 {
                src
            } else {
                [mul255(src[0], scale), mul255(src[1], scale), mul255(src[2], scale), mul255(src[3], scale)]
            };
            *dst = source_over(*dst, src);
        }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }
}

// Printing megapixels of data on a failed assert helps nobody.
impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("painted", &self.painted_count())
            .finish()
    }
}

/// The flattened image handed to the window.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// Flatten a premultiplied composite over an opaque `paper` colour.
    /// Visual: transparent canvas areas show the paper, paint sits on top.
    pub fn flatten(src: &PixelBuffer, paper: Rgb) -> Result<Self, Error> {
        let mut pixels = alloc_filled(src.width, src.height, 0u32)?;
        for (out, p) in pixels.iter_mut().zip(&src.pixels) {
            let inv = 255 - p[3];
            let r = p[0].saturating_add(mul255(paper.r, inv)) as u32;
            let g = p[1].saturating_add(mul255(paper.g, inv)) as u32;
            let b = p[2].saturating_add(mul255(paper.b, inv)) as u32;
            *out = (r << 16) | (g << 8) | b;
        }
        Ok(Self { width: src.width, height: src.height, pixels })
    }
}
