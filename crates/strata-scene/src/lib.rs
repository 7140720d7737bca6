//! Host-environment interfaces for the LOD layer.
//!
//! The LOD core never talks to an engine directly: it reads positions and
//! the observation point through [`ScenePositions`] and [`ObserverSource`],
//! and applies swaps through [`RenderSink`]. Engines implement these traits
//! over their scene graph; [`MemoryScene`] is the in-memory implementation
//! used by tests and the demo.

mod memory;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use strata_materials::MaterialDesc;
use strata_mesh::MeshData;

pub use memory::MemoryScene;

/// Stable identity of a scene object participating in LOD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Allocate a fresh process-unique identity. Hosts with their own
    /// entity handles may construct `EntityId` from those instead.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Auxiliary sub-elements gated by the same distance thresholds as mesh LOD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuxKind {
    /// A light attached to the object.
    Light,
    /// A particle emitter attached to the object.
    ParticleEmitter,
    /// An audio source attached to the object.
    AudioSource,
}

/// World-position queries for registered entities.
pub trait ScenePositions {
    /// The entity's world position, or `None` if the entity no longer
    /// exists. A missing entity is skipped by the scheduler, never an error.
    fn world_position(&self, id: EntityId) -> Option<Vec3>;
}

/// Source of the observation point all LOD distances are measured against.
pub trait ObserverSource {
    /// The current observation point, or `None` while no valid observer is
    /// resolved. Cycles with an unresolved observer are skipped and
    /// entities stay pending.
    fn observation_point(&self) -> Option<Vec3>;
}

/// Render-state application. All three calls happen on the thread that owns
/// renderable state; the LOD core never invokes them off-thread.
pub trait RenderSink {
    /// Replace the entity's rendered mesh.
    fn set_active_mesh(&mut self, id: EntityId, mesh: Arc<MeshData>);
    /// Replace the entity's active material set.
    fn set_active_materials(&mut self, id: EntityId, materials: Vec<Arc<MaterialDesc>>);
    /// Enable or disable an auxiliary component.
    fn set_component_enabled(&mut self, id: EntityId, kind: AuxKind, enabled: bool);
}
