//! Material descriptor shared across LOD levels.

use thiserror::Error;
use tracing::warn;

use crate::texture::{TextureData, TextureError};

/// Errors returned during material validation.
#[derive(Debug, Error)]
pub enum MaterialError {
    /// The material name must not be empty.
    #[error("material name must not be empty")]
    EmptyName,
}

/// A copyable material descriptor: base color plus an optional texture.
///
/// `texture_scale` records the resolution factor relative to the source
/// material (1.0 = full resolution); it is informational for the host and
/// telemetry, the actual pixels live in `texture`.
#[derive(Clone, Debug)]
pub struct MaterialDesc {
    /// Human-readable name.
    pub name: String,
    /// Base color in linear RGBA, each component clamped to `[0.0, 1.0]`.
    pub base_color: [f32; 4],
    /// Optional texture. Absent materials still scale (the factor is
    /// recorded, there is just nothing to resample).
    pub texture: Option<TextureData>,
    /// Texture resolution factor relative to the source material.
    pub texture_scale: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            base_color: [0.8, 0.8, 0.8, 1.0],
            texture: None,
            texture_scale: 1.0,
        }
    }
}

impl MaterialDesc {
    /// Validates and clamps all fields to their legal ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialError::EmptyName`] if the name is empty.
    pub fn validated(mut self) -> Result<Self, MaterialError> {
        if self.name.is_empty() {
            return Err(MaterialError::EmptyName);
        }
        for c in &mut self.base_color {
            *c = c.clamp(0.0, 1.0);
        }
        self.texture_scale = self.texture_scale.clamp(0.0, 1.0);
        Ok(self)
    }

    /// Derive the variant of this material for a detail level, with its
    /// texture resampled by `factor`.
    ///
    /// An unreadable texture is a non-fatal resource error: the variant
    /// falls back to the unscaled texture and the condition is logged.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let suffix = format!("lod{:02}", ((1.0 - factor) * 100.0).round() as u32);
        let texture = match &self.texture {
            Some(tex) => match tex.scaled(factor, &suffix) {
                Ok(scaled) => Some(scaled),
                Err(TextureError::Unreadable(name)) => {
                    warn!(
                        material = %self.name,
                        texture = %name,
                        "texture not resizable, falling back to unscaled material"
                    );
                    Some(tex.clone())
                }
            },
            None => None,
        };
        Self {
            name: format!("{}.{suffix}", self.name),
            base_color: self.base_color,
            texture,
            texture_scale: self.texture_scale * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    /// Validation rejects empty names and clamps color components.
    #[test]
    fn test_validation_clamps_color() {
        let mat = MaterialDesc {
            name: "m".into(),
            base_color: [2.0, -1.0, 0.5, 1.0],
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(mat.base_color, [1.0, 0.0, 0.5, 1.0]);

        let err = MaterialDesc {
            name: String::new(),
            ..Default::default()
        }
        .validated();
        assert!(matches!(err, Err(MaterialError::EmptyName)));
    }

    /// Scaling a textured material resamples the texture and records the
    /// combined factor.
    #[test]
    fn test_scaled_resamples_texture() {
        let mat = MaterialDesc {
            name: "rock".into(),
            texture: Some(TextureData::solid("rock_albedo", 64, 64, [9, 9, 9, 255])),
            ..Default::default()
        };
        let half = mat.scaled(0.5);
        assert_eq!(half.texture.as_ref().unwrap().dimensions(), (32, 32));
        assert!((half.texture_scale - 0.5).abs() < f32::EPSILON);
        assert_eq!(half.name, "rock.lod50");
    }

    /// An unreadable texture falls back to the unscaled pixels instead of
    /// failing the level.
    #[test]
    fn test_unreadable_texture_falls_back_unscaled() {
        let mat = MaterialDesc {
            name: "broken".into(),
            texture: Some(TextureData::new("broken_tex", RgbaImage::new(0, 0))),
            ..Default::default()
        };
        let scaled = mat.scaled(0.25);
        let tex = scaled.texture.unwrap();
        assert_eq!(tex.dimensions(), (0, 0));
        assert_eq!(tex.name, "broken_tex");
    }

    /// A texture-less material still records the scale factor.
    #[test]
    fn test_untextured_material_records_factor() {
        let mat = MaterialDesc::default();
        let scaled = mat.scaled(0.25);
        assert!(scaled.texture.is_none());
        assert!((scaled.texture_scale - 0.25).abs() < f32::EPSILON);
    }
}
