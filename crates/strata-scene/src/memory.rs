//! In-memory scene used by tests and the headless demo.

use std::cell::Cell;
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use strata_materials::MaterialDesc;
use strata_mesh::MeshData;

use crate::{AuxKind, EntityId, ObserverSource, RenderSink, ScenePositions};

/// A plain in-memory implementation of all three host traits.
///
/// Tracks every render-state call and position query with counters so tests
/// can assert on exactly how much work the scheduler performed (no-op swaps,
/// skipped cycles, and so on).
#[derive(Default)]
pub struct MemoryScene {
    positions: FxHashMap<EntityId, Vec3>,
    observer: Option<Vec3>,
    active_meshes: FxHashMap<EntityId, Arc<MeshData>>,
    active_materials: FxHashMap<EntityId, Vec<Arc<MaterialDesc>>>,
    component_states: FxHashMap<(EntityId, AuxKind), bool>,
    position_queries: Cell<u64>,
    mesh_swaps: u64,
    material_swaps: u64,
    component_toggles: u64,
}

impl MemoryScene {
    /// Create an empty scene with no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place (or move) an entity.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) {
        self.positions.insert(id, position);
    }

    /// Remove an entity, simulating scene-object destruction.
    pub fn remove_entity(&mut self, id: EntityId) {
        self.positions.remove(&id);
        self.active_meshes.remove(&id);
        self.active_materials.remove(&id);
    }

    /// Set or clear the observation point.
    pub fn set_observer(&mut self, observer: Option<Vec3>) {
        self.observer = observer;
    }

    /// The mesh currently applied to an entity, if any.
    #[must_use]
    pub fn active_mesh(&self, id: EntityId) -> Option<&Arc<MeshData>> {
        self.active_meshes.get(&id)
    }

    /// The material set currently applied to an entity, if any.
    #[must_use]
    pub fn active_materials(&self, id: EntityId) -> Option<&[Arc<MaterialDesc>]> {
        self.active_materials.get(&id).map(Vec::as_slice)
    }

    /// Whether an auxiliary component is enabled. Defaults to `true` until
    /// the LOD layer toggles it.
    #[must_use]
    pub fn component_enabled(&self, id: EntityId, kind: AuxKind) -> bool {
        self.component_states.get(&(id, kind)).copied().unwrap_or(true)
    }

    /// Number of `world_position` queries served.
    #[must_use]
    pub fn position_queries(&self) -> u64 {
        self.position_queries.get()
    }

    /// Number of `set_active_mesh` calls received.
    #[must_use]
    pub fn mesh_swaps(&self) -> u64 {
        self.mesh_swaps
    }

    /// Number of `set_active_materials` calls received.
    #[must_use]
    pub fn material_swaps(&self) -> u64 {
        self.material_swaps
    }

    /// Number of `set_component_enabled` calls received.
    #[must_use]
    pub fn component_toggles(&self) -> u64 {
        self.component_toggles
    }

    /// Reset all counters, keeping scene contents.
    pub fn reset_counters(&mut self) {
        self.position_queries.set(0);
        self.mesh_swaps = 0;
        self.material_swaps = 0;
        self.component_toggles = 0;
    }
}

impl ScenePositions for MemoryScene {
    fn world_position(&self, id: EntityId) -> Option<Vec3> {
        self.position_queries.set(self.position_queries.get() + 1);
        self.positions.get(&id).copied()
    }
}

impl ObserverSource for MemoryScene {
    fn observation_point(&self) -> Option<Vec3> {
        self.observer
    }
}

impl RenderSink for MemoryScene {
    fn set_active_mesh(&mut self, id: EntityId, mesh: Arc<MeshData>) {
        self.mesh_swaps += 1;
        self.active_meshes.insert(id, mesh);
    }

    fn set_active_materials(&mut self, id: EntityId, materials: Vec<Arc<MaterialDesc>>) {
        self.material_swaps += 1;
        self.active_materials.insert(id, materials);
    }

    fn set_component_enabled(&mut self, id: EntityId, kind: AuxKind, enabled: bool) {
        self.component_toggles += 1;
        self.component_states.insert((id, kind), enabled);
    }
}
