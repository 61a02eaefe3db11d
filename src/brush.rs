// Brushes: the descriptor a stroke is drawn with, optional image tips,
// and the catalog of presets the shell offers to the user.

use crate::error::Error;
use crate::pixels::Rgb;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Smallest dab diameter we render; smaller or non-finite sizes clamp here.
pub const MIN_SIZE: f32 = 1.0;
/// Smallest spacing ratio accepted.
pub const MIN_SPACING_RATIO: f32 = 0.01;
/// Floor for `size * spacing_ratio` so a segment never needs unbounded steps.
pub const MIN_SPACING_PX: f32 = 0.5;
/// Imported tips are downscaled so their longest side fits in this.
pub const MAX_TIP_SIDE: u32 = 256;

/// Immutable alpha mask used as a dab shape instead of a circle.
/// 255 = full ink, 0 = no ink.
#[derive(Clone, PartialEq)]
pub struct StampImage {
    mask: GrayImage,
}

impl StampImage {
    /// Wrap an existing alpha mask.
    pub fn from_mask(mask: GrayImage) -> Result<Self, Error> {
        if mask.width() == 0 || mask.height() == 0 {
            return Err(Error::EmptyBrushImage);
        }
        Ok(Self { mask })
    }

    /// Turn any decoded picture into a tip.
    /// Visual: big pictures shrink to fit 256px; images with transparency
    /// keep their alpha as the ink shape, opaque images ink where they are dark.
    pub fn from_image(img: &DynamicImage) -> Result<Self, Error> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::EmptyBrushImage);
        }

        let scale = (MAX_TIP_SIDE as f32 / w as f32).min(MAX_TIP_SIDE as f32 / h as f32);
        let resized = if scale >= 1.0 {
            img.clone()
        } else {
            let nw = ((w as f32 * scale) as u32).max(1);
            let nh = ((h as f32 * scale) as u32).max(1);
            img.resize_exact(nw, nh, FilterType::Lanczos3)
        };

        let mask = if resized.color().has_alpha() {
            let rgba = resized.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| Luma([rgba.get_pixel(x, y)[3]]))
        } else {
            let rgb = resized.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let p = rgb.get_pixel(x, y);
                let mean = (p[0] as u16 + p[1] as u16 + p[2] as u16) / 3;
                Luma([255 - mean as u8])
            })
        };

        debug!(width = mask.width(), height = mask.height(), "brush tip converted");
        Self::from_mask(mask)
    }

    /// Decode an image file from disk and convert it into a tip.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let img = image::open(path)?;
        Self::from_image(&img)
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Mask alpha at normalised coordinates (u, v) in [0,1), nearest sample.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> u8 {
        let x = ((u * self.mask.width() as f32) as u32).min(self.mask.width() - 1);
        let y = ((v * self.mask.height() as f32) as u32).min(self.mask.height() - 1);
        self.mask.get_pixel(x, y)[0]
    }
}

impl fmt::Debug for StampImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StampImage")
            .field("width", &self.mask.width())
            .field("height", &self.mask.height())
            .finish()
    }
}

/// Everything needed to render a stroke.
/// Tips are shared behind `Arc` and never mutated, so a recorded stroke keeps
/// the exact tip it was drawn with even after the live brush moves on.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushDescriptor {
    pub size: f32,          // dab diameter in pixels
    pub opacity: u8,        // 0..=255
    pub spacing_ratio: f32, // dab spacing as a fraction of size
    pub color: Rgb,
    pub is_eraser: bool,
    pub stamp: Option<Arc<StampImage>>,
}

impl BrushDescriptor {
    /// A plain round brush.
    pub fn round(size: f32, opacity: u8, spacing_ratio: f32, color: Rgb) -> Self {
        Self { size, opacity, spacing_ratio, color, is_eraser: false, stamp: None }
    }

    /// A round eraser. Colour and opacity are irrelevant for erasing.
    pub fn eraser(size: f32, spacing_ratio: f32) -> Self {
        Self { is_eraser: true, ..Self::round(size, 255, spacing_ratio, Rgb::BLACK) }
    }

    /// Same brush, drawing with `tip` instead of a circle.
    pub fn with_stamp(mut self, tip: Arc<StampImage>) -> Self {
        self.stamp = Some(tip);
        self
    }

    /// Diameter actually rendered (clamped to MIN_SIZE).
    pub fn effective_size(&self) -> f32 {
        if self.size.is_finite() { self.size.max(MIN_SIZE) } else { MIN_SIZE }
    }

    /// Distance between consecutive dab centres.
    pub fn spacing(&self) -> f32 {
        let ratio = if self.spacing_ratio.is_finite() {
            self.spacing_ratio.max(MIN_SPACING_RATIO)
        } else {
            MIN_SPACING_RATIO
        };
        (self.effective_size() * ratio).max(MIN_SPACING_PX)
    }
}

impl Default for BrushDescriptor {
    fn default() -> Self {
        Self::round(2.0, 255, 0.10, Rgb::BLACK)
    }
}

/// A named brush offered to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushPreset {
    pub name: String,
    pub brush: BrushDescriptor,
    /// User-imported (removable) as opposed to built in.
    pub imported: bool,
}

impl BrushPreset {
    pub fn builtin(name: &str, brush: BrushDescriptor) -> Self {
        Self { name: name.to_string(), brush, imported: false }
    }

    /// A preset drawing with an imported tip.
    pub fn imported(name: &str, tip: StampImage, size: f32, opacity: u8, spacing_ratio: f32) -> Self {
        let brush = BrushDescriptor::round(size, opacity, spacing_ratio, Rgb::BLACK).with_stamp(Arc::new(tip));
        Self { name: name.to_string(), brush, imported: true }
    }
}

/// The brush library. Owned by the application shell and passed around
/// explicitly; the painting core only ever sees `BrushDescriptor` values.
#[derive(Debug, Clone)]
pub struct BrushCatalog {
    presets: Vec<BrushPreset>,
}

impl BrushCatalog {
    /// Catalog holding the built-in presets.
    pub fn with_defaults() -> Self {
        let presets = vec![
            BrushPreset::builtin("Pencil", BrushDescriptor::round(2.0, 255, 0.10, Rgb::BLACK)),
            BrushPreset::builtin("Ink Pen", BrushDescriptor::round(5.0, 255, 0.25, Rgb::BLACK)),
            BrushPreset::builtin("Soft Brush", BrushDescriptor::round(20.0, 60, 0.10, Rgb::BLACK)),
            BrushPreset::builtin("Marker", BrushDescriptor::round(15.0, 180, 0.10, Rgb::BLACK)),
            BrushPreset::builtin("Eraser", BrushDescriptor::eraser(20.0, 0.25)),
        ];
        Self { presets }
    }

    /// Append a preset and return its index.
    pub fn add(&mut self, preset: BrushPreset) -> usize {
        debug!(name = %preset.name, imported = preset.imported, "brush added to catalog");
        self.presets.push(preset);
        self.presets.len() - 1
    }

    /// Remove an imported preset. Built-in presets stay; returns None for them.
    pub fn remove(&mut self, index: usize) -> Option<BrushPreset> {
        let preset = self.presets.get(index)?;
        if !preset.imported {
            warn!(name = %preset.name, "built-in brushes cannot be removed");
            return None;
        }
        Some(self.presets.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&BrushPreset> {
        self.presets.get(index)
    }

    /// Index of the first preset called `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrushPreset> {
        self.presets.iter()
    }
}

impl Default for BrushCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb as ImgRgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn spacing_is_size_times_ratio() {
        let b = BrushDescriptor::round(10.0, 255, 0.5, Rgb::BLACK);
        assert_eq!(b.spacing(), 5.0);
    }

    #[test]
    fn bad_geometry_is_clamped_not_rejected() {
        let b = BrushDescriptor::round(-4.0, 255, 0.0, Rgb::BLACK);
        assert_eq!(b.effective_size(), MIN_SIZE);
        assert_eq!(b.spacing(), MIN_SPACING_PX);

        let nan = BrushDescriptor::round(f32::NAN, 255, f32::NAN, Rgb::BLACK);
        assert_eq!(nan.effective_size(), MIN_SIZE);
        assert!(nan.spacing() >= MIN_SPACING_PX);
    }

    #[test]
    fn defaults_match_the_builtin_library() {
        let cat = BrushCatalog::with_defaults();
        assert_eq!(cat.len(), 5);
        let eraser = cat.get(cat.find("eraser").unwrap()).unwrap();
        assert!(eraser.brush.is_eraser);
        let soft = cat.get(cat.find("Soft Brush").unwrap()).unwrap();
        assert_eq!(soft.brush.opacity, 60);
        assert_eq!(soft.brush.size, 20.0);
    }

    #[test]
    fn only_imported_presets_can_be_removed() {
        let mut cat = BrushCatalog::with_defaults();
        assert!(cat.remove(0).is_none());
        assert_eq!(cat.len(), 5);

        let tip = StampImage::from_mask(GrayImage::from_pixel(4, 4, Luma([255]))).unwrap();
        let idx = cat.add(BrushPreset::imported("Leaf", tip, 12.0, 200, 0.2));
        assert!(cat.get(idx).unwrap().brush.stamp.is_some());
        let removed = cat.remove(idx).unwrap();
        assert_eq!(removed.name, "Leaf");
        assert_eq!(cat.len(), 5);
        assert!(cat.remove(99).is_none());
    }

    #[test]
    fn opaque_image_becomes_darkness_mask() {
        let mut img = RgbImage::from_pixel(2, 1, ImgRgb([255, 255, 255]));
        img.put_pixel(1, 0, ImgRgb([0, 0, 0]));
        let tip = StampImage::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(tip.sample(0.0, 0.0), 0);
        assert_eq!(tip.sample(0.75, 0.0), 255);
    }

    #[test]
    fn transparent_image_keeps_its_alpha() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 77]));
        let tip = StampImage::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(tip.sample(0.5, 0.5), 77);
    }

    #[test]
    fn large_tips_are_downscaled_keeping_aspect() {
        let img = RgbImage::from_pixel(1024, 512, ImgRgb([0, 0, 0]));
        let tip = StampImage::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!((tip.width(), tip.height()), (256, 128));

        let small = RgbImage::from_pixel(10, 20, ImgRgb([0, 0, 0]));
        let tip = StampImage::from_image(&DynamicImage::ImageRgb8(small)).unwrap();
        assert_eq!((tip.width(), tip.height()), (10, 20));
    }

    #[test]
    fn empty_mask_is_rejected() {
        let err = StampImage::from_mask(GrayImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, Error::EmptyBrushImage));
    }
}
