//! Owned texture pixel data with nearest-neighbor downscaling.

use image::{RgbaImage, imageops};
use thiserror::Error;

/// Errors produced when deriving a scaled texture variant.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The texture has no readable pixel data to resample.
    #[error("texture {0:?} is not readable/sampleable")]
    Unreadable(String),
}

/// An owned RGBA8 texture that can produce resized variants.
///
/// Wraps an [`image::RgbaImage`] so pixel data is always copyable and
/// sampleable; GPU-resident textures must be read back by the host before
/// being handed to this type.
#[derive(Clone, Debug)]
pub struct TextureData {
    /// Debug name, carried into scaled variants.
    pub name: String,
    image: RgbaImage,
}

impl TextureData {
    /// Wrap an owned image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Solid-color texture, mostly useful in tests and demos.
    #[must_use]
    pub fn solid(name: impl Into<String>, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let image = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        Self::new(name, image)
    }

    /// Texture dimensions `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Borrow the underlying pixel data.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Produce a variant resampled to `max(1, floor(dim * factor))` per axis
    /// using nearest-neighbor filtering.
    ///
    /// # Errors
    ///
    /// [`TextureError::Unreadable`] when the source has no pixel data
    /// (zero-sized in either dimension).
    pub fn scaled(&self, factor: f32, suffix: &str) -> Result<Self, TextureError> {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Err(TextureError::Unreadable(self.name.clone()));
        }
        let factor = factor.clamp(0.0, 1.0);
        let new_w = ((w as f32 * factor).floor() as u32).max(1);
        let new_h = ((h as f32 * factor).floor() as u32).max(1);
        let image = imageops::resize(&self.image, new_w, new_h, imageops::FilterType::Nearest);
        Ok(Self {
            name: format!("{}.{suffix}", self.name),
            image,
        })
    }
}
