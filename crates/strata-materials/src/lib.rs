//! Material descriptors and scaled-texture variants for LOD levels.
//!
//! Distant detail levels can trade texture resolution for memory by pairing
//! the reduced mesh with a material whose texture has been resampled down.
//! Resampling is nearest-neighbor; quality at distance is not the point.

mod material;
mod texture;

pub use material::{MaterialDesc, MaterialError};
pub use texture::{TextureData, TextureError};
