//! Per-object LOD runtime state.
//!
//! State machine: `Pending` (no observation point resolved yet) →
//! `Active(level)`, with `Active(k) → Active(k')` transitions on
//! recomputation. Teardown is `UpdateScheduler::unregister`, which drops the
//! entity and every `Arc` it exclusively holds.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use strata_mesh::MeshId;
use strata_scene::{AuxKind, EntityId, RenderSink};

use crate::error::LodError;
use crate::profile::LodProfile;
use crate::scheduler::LevelObserver;

/// Lifecycle state of a registered entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodState {
    /// Registered, but no evaluation has happened yet (observation point
    /// unresolved or entity not yet drained).
    Pending,
    /// An active detail level has been applied.
    Active(usize),
}

/// An auxiliary sub-element (light, particle emitter, audio source) enabled
/// only while the entity is within a distance threshold.
#[derive(Clone, Copy, Debug)]
pub struct AuxElement {
    /// Which component this gates.
    pub kind: AuxKind,
    /// The component is enabled while `distance <= enable_within`.
    pub enable_within: f32,
}

/// Tracks the last state pushed to the sink so toggles only fire on change.
#[derive(Clone, Copy, Debug)]
struct AuxSlot {
    element: AuxElement,
    enabled: bool,
}

/// Per-object LOD runtime state.
pub struct LodEntity {
    id: EntityId,
    mesh_id: MeshId,
    profile: Arc<LodProfile>,
    state: LodState,
    last_distance: f32,
    next_update_at: Instant,
    aux: Vec<AuxSlot>,
}

impl LodEntity {
    /// Create a pending entity bound to a shared profile.
    #[must_use]
    pub fn new(
        id: EntityId,
        mesh_id: MeshId,
        profile: Arc<LodProfile>,
        aux: Vec<AuxElement>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            mesh_id,
            profile,
            state: LodState::Pending,
            last_distance: 0.0,
            next_update_at: now,
            aux: aux
                .into_iter()
                .map(|element| AuxSlot {
                    element,
                    // Hosts start components enabled; mirror that.
                    enabled: true,
                })
                .collect(),
        }
    }

    /// The entity's scene identity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Identity of the source mesh (the profile cache key).
    #[must_use]
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    /// The shared profile this entity swaps between.
    #[must_use]
    pub fn profile(&self) -> &Arc<LodProfile> {
        &self.profile
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LodState {
        self.state
    }

    /// The active level index, or `None` while pending.
    #[must_use]
    pub fn current_level(&self) -> Option<usize> {
        match self.state {
            LodState::Pending => None,
            LodState::Active(level) => Some(level),
        }
    }

    /// Distance computed at the last evaluation.
    #[must_use]
    pub fn last_distance(&self) -> f32 {
        self.last_distance
    }

    /// Triangle count of the active representation, for telemetry.
    #[must_use]
    pub fn active_triangle_count(&self) -> Option<usize> {
        let level = self.current_level()?;
        Some(self.profile.level(level)?.triangle_count)
    }

    /// Earliest time this entity is eligible for evaluation again.
    #[must_use]
    pub fn next_update_at(&self) -> Instant {
        self.next_update_at
    }

    /// Set the next-eligible-update time after an evaluation.
    pub fn set_next_update_at(&mut self, at: Instant) {
        self.next_update_at = at;
    }

    /// Evaluate the entity at `distance` against the already-selected
    /// `target` level: swap the active representation when the level
    /// changed, toggle auxiliary components across their thresholds, and
    /// notify observers of a committed transition.
    ///
    /// When `target` equals the current level this is observably a no-op:
    /// no sink call, no notification. Returns whether a swap was committed.
    ///
    /// # Errors
    ///
    /// [`LodError::MissingLevel`] when `target` is out of range for the
    /// profile; the entity keeps its current representation.
    pub fn evaluate(
        &mut self,
        target: usize,
        distance: f32,
        sink: &mut dyn RenderSink,
        observers: &mut [LevelObserver],
    ) -> Result<bool, LodError> {
        self.last_distance = distance;
        self.update_aux(distance, sink);

        let old = self.current_level();
        if old == Some(target) {
            return Ok(false);
        }

        let level = self.profile.level(target).ok_or(LodError::MissingLevel {
            requested: target,
            available: self.profile.len(),
        })?;

        sink.set_active_mesh(self.id, Arc::clone(&level.mesh));
        if let Some(material) = &level.material {
            sink.set_active_materials(self.id, vec![Arc::clone(material)]);
        }
        self.state = LodState::Active(target);
        debug!(
            entity = self.id.0,
            ?old,
            new = target,
            distance,
            triangles = level.triangle_count,
            "committed level transition"
        );
        for observer in observers.iter_mut() {
            observer(self.id, old, target);
        }
        Ok(true)
    }

    /// Toggle auxiliary components whose threshold the distance crossed.
    /// Unchanged components produce no sink call.
    fn update_aux(&mut self, distance: f32, sink: &mut dyn RenderSink) {
        for slot in &mut self.aux {
            let enabled = distance <= slot.element.enable_within;
            if enabled != slot.enabled {
                slot.enabled = enabled;
                sink.set_component_enabled(self.id, slot.element.kind, enabled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use strata_mesh::MeshData;
    use strata_scene::MemoryScene;

    fn profile() -> Arc<LodProfile> {
        use crate::profile::LevelRepresentation;
        let full = Arc::new(MeshData::new(
            "m",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![[0, 1, 2], [0, 2, 3]],
        ));
        let reduced = Arc::new(MeshData::new(
            "m.lod50",
            full.positions.clone(),
            vec![[0, 1, 2]],
        ));
        Arc::new(LodProfile::new(vec![
            LevelRepresentation {
                mesh: full,
                material: None,
                triangle_count: 2,
                threshold: 0.0,
            },
            LevelRepresentation {
                mesh: reduced,
                material: None,
                triangle_count: 1,
                threshold: 50.0,
            },
        ]))
    }

    fn entity(aux: Vec<AuxElement>) -> LodEntity {
        LodEntity::new(EntityId(1), MeshId(1), profile(), aux, Instant::now())
    }

    /// The first evaluation transitions Pending → Active and notifies with
    /// no old level.
    #[test]
    fn test_first_evaluation_activates() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut entity = entity(Vec::new());
        let mut scene = MemoryScene::new();
        let seen: Rc<RefCell<Vec<(EntityId, Option<usize>, usize)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut observers: Vec<LevelObserver> =
            vec![Box::new(move |id, old, new| sink.borrow_mut().push((id, old, new)))];

        let swapped = entity
            .evaluate(0, 10.0, &mut scene, &mut observers)
            .unwrap();
        assert!(swapped);
        assert_eq!(entity.state(), LodState::Active(0));
        assert_eq!(scene.mesh_swaps(), 1);
        assert_eq!(entity.active_triangle_count(), Some(2));
        assert_eq!(seen.borrow().as_slice(), &[(EntityId(1), None, 0)]);
    }

    /// Re-applying the current level is observably a no-op.
    #[test]
    fn test_noop_swap_has_no_side_effects() {
        let mut entity = entity(Vec::new());
        let mut scene = MemoryScene::new();
        let mut observers: Vec<LevelObserver> = Vec::new();
        entity.evaluate(1, 60.0, &mut scene, &mut observers).unwrap();
        let before = Arc::as_ptr(scene.active_mesh(EntityId(1)).unwrap());
        let swaps = scene.mesh_swaps();

        let swapped = entity
            .evaluate(1, 61.0, &mut scene, &mut observers)
            .unwrap();
        assert!(!swapped);
        assert_eq!(scene.mesh_swaps(), swaps);
        assert_eq!(
            Arc::as_ptr(scene.active_mesh(EntityId(1)).unwrap()),
            before,
            "active mesh reference must be unchanged"
        );
    }

    /// A target past the profile's levels is an isolated error; the entity
    /// keeps its state.
    #[test]
    fn test_missing_level_is_isolated() {
        let mut entity = entity(Vec::new());
        let mut scene = MemoryScene::new();
        let mut observers: Vec<LevelObserver> = Vec::new();
        entity.evaluate(0, 1.0, &mut scene, &mut observers).unwrap();
        let result = entity.evaluate(9, 1.0, &mut scene, &mut observers);
        assert!(matches!(result, Err(LodError::MissingLevel { .. })));
        assert_eq!(entity.state(), LodState::Active(0));
    }

    /// Auxiliary components toggle when their threshold is crossed, and
    /// only then.
    #[test]
    fn test_aux_toggles_on_threshold_crossing() {
        let mut entity = entity(vec![AuxElement {
            kind: AuxKind::Light,
            enable_within: 30.0,
        }]);
        let mut scene = MemoryScene::new();
        let mut observers: Vec<LevelObserver> = Vec::new();

        // Within threshold: already enabled, no toggle.
        entity.evaluate(0, 10.0, &mut scene, &mut observers).unwrap();
        assert_eq!(scene.component_toggles(), 0);

        // Crossing out: one disable.
        entity.evaluate(1, 80.0, &mut scene, &mut observers).unwrap();
        assert_eq!(scene.component_toggles(), 1);
        assert!(!scene.component_enabled(EntityId(1), AuxKind::Light));

        // Staying out: no further toggle.
        entity.evaluate(1, 90.0, &mut scene, &mut observers).unwrap();
        assert_eq!(scene.component_toggles(), 1);

        // Coming back in: re-enable.
        entity.evaluate(0, 5.0, &mut scene, &mut observers).unwrap();
        assert_eq!(scene.component_toggles(), 2);
        assert!(scene.component_enabled(EntityId(1), AuxKind::Light));
    }
}
