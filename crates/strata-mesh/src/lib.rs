//! Mesh data model and triangle-reduction algorithms for the Strata LOD layer.

mod aabb;
mod mesh;
mod simplify;

pub use aabb::Aabb;
pub use mesh::{MeshData, MeshId};
pub use simplify::{SimplifyStrategy, simplify};
