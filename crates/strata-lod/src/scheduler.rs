//! Centralized update scheduler.
//!
//! One explicitly constructed scheduler owns the registration set and
//! amortizes LOD recomputation: each cycle it resolves the observation
//! point, skips the cycle entirely when the observer barely moved, drains a
//! bounded batch of due entities, evaluates them closest-first, and
//! re-enqueues them at the tail so nothing starves. Per-entity failures are
//! logged and isolated; the cycle never aborts because one entity misfired.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use strata_materials::MaterialDesc;
use strata_mesh::{MeshData, MeshId};
use strata_scene::{EntityId, ObserverSource, RenderSink, ScenePositions};

use crate::cache::{ProfileCache, ProfileParams};
use crate::compute::DistancePipeline;
use crate::entity::{AuxElement, LodEntity};
use crate::error::LodError;
use crate::policy::LodPolicy;

/// Callback invoked after a committed level transition:
/// `(entity, old level, new level)`. Old is `None` for the first activation.
pub type LevelObserver = Box<dyn FnMut(EntityId, Option<usize>, usize)>;

/// Scheduler tuning knobs.
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    /// Minimum time between update cycles and between evaluations of the
    /// same entity.
    pub update_interval: Duration,
    /// Maximum entities drained per cycle.
    pub max_objects_per_cycle: usize,
    /// Squared observer movement below which a cycle is a no-op (unless a
    /// forced update was requested). This is the main backpressure valve
    /// for a stationary observer.
    pub move_epsilon_sq: f32,
    /// Run the distance/level pass on background worker threads. Swapping
    /// always stays on the calling thread.
    pub background_compute: bool,
    /// Worker count for the background pass.
    pub background_workers: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(250),
            max_objects_per_cycle: 64,
            move_epsilon_sq: 0.1,
            background_compute: false,
            background_workers: 1,
        }
    }
}

/// What one call to [`UpdateScheduler::tick`] did.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleStats {
    /// Whether a full cycle ran (false: cadence/observer/epsilon skip).
    pub ran: bool,
    /// Entities evaluated this call, including drained background results.
    pub evaluated: usize,
    /// Level transitions committed.
    pub transitions: usize,
    /// Units of work skipped (destroyed entities dropped, failed swaps).
    pub skipped: usize,
}

/// Owns the registration set and drives all LOD recomputation.
///
/// There is no implicit global instance: construct one and hand it to
/// whatever owns the scene lifecycle.
pub struct UpdateScheduler {
    policy: LodPolicy,
    params: ProfileParams,
    options: SchedulerOptions,
    cache: ProfileCache,
    entities: FxHashMap<EntityId, LodEntity>,
    queue: VecDeque<EntityId>,
    observers: Vec<LevelObserver>,
    pipeline: Option<DistancePipeline>,
    last_observer_pos: Option<Vec3>,
    last_cycle_at: Option<Instant>,
    forced: bool,
}

impl UpdateScheduler {
    /// Construct a scheduler. Spawns background workers when
    /// `options.background_compute` is set.
    #[must_use]
    pub fn new(policy: LodPolicy, params: ProfileParams, options: SchedulerOptions) -> Self {
        let pipeline = options
            .background_compute
            .then(|| DistancePipeline::new(policy.clone(), options.background_workers));
        Self {
            policy,
            params,
            options,
            cache: ProfileCache::new(),
            entities: FxHashMap::default(),
            queue: VecDeque::new(),
            observers: Vec::new(),
            pipeline,
            last_observer_pos: None,
            last_cycle_at: None,
            forced: false,
        }
    }

    /// Register a scene object for LOD management.
    ///
    /// Generates (or reuses) the LOD profile for `mesh_id` and enqueues the
    /// entity in `Pending` state; the first completed cycle activates it.
    ///
    /// # Errors
    ///
    /// [`LodError::EmptyMesh`] when the source has no geometry. LOD is
    /// disabled for that entity (it is not registered); the scheduler keeps
    /// running.
    pub fn register(
        &mut self,
        id: EntityId,
        mesh_id: MeshId,
        source: &Arc<MeshData>,
        material: Option<&Arc<MaterialDesc>>,
        aux: Vec<AuxElement>,
        now: Instant,
    ) -> Result<(), LodError> {
        let profile = self
            .cache
            .get_or_create(mesh_id, source, material, &self.policy, &self.params)
            .inspect_err(|err| warn!(entity = id.0, %err, "registration rejected"))?;
        self.entities
            .insert(id, LodEntity::new(id, mesh_id, profile, aux, now));
        self.queue.push_back(id);
        Ok(())
    }

    /// Remove an entity, dropping every representation `Arc` it holds.
    /// Stale queue slots are skipped lazily on later drains.
    pub fn unregister(&mut self, id: EntityId) {
        self.entities.remove(&id);
    }

    /// Request that the next cycle run even if the observer is stationary.
    pub fn force_update(&mut self) {
        self.forced = true;
    }

    /// Subscribe to committed level transitions (audio, gameplay logic,
    /// telemetry).
    pub fn subscribe(&mut self, observer: LevelObserver) {
        self.observers.push(observer);
    }

    /// Number of registered entities.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.entities.len()
    }

    /// The profile cache, exposed for inspection.
    #[must_use]
    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    /// Drop all cached profiles. Registered entities keep their levels
    /// alive through their own `Arc`s.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// A registered entity's runtime state.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&LodEntity> {
        self.entities.get(&id)
    }

    /// Cancel in-flight background work and join the workers. The
    /// registration set is untouched; discarded batches simply leave their
    /// entities queued for a future cycle.
    pub fn shutdown(&mut self) {
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.cancel_in_flight();
            pipeline.shutdown();
        }
        self.pipeline = None;
    }

    /// Run one scheduling cycle.
    ///
    /// `host` supplies positions and the observation point and receives the
    /// resulting swaps; `now` is the cycle timestamp (injectable so tests
    /// control time).
    pub fn tick<H>(&mut self, host: &mut H, now: Instant) -> CycleStats
    where
        H: ScenePositions + ObserverSource + RenderSink,
    {
        let mut stats = CycleStats::default();

        // Cadence: cycles are wall-clock paced, independent of how often
        // the engine calls us.
        if let Some(last) = self.last_cycle_at
            && now < last + self.options.update_interval
        {
            return stats;
        }

        // Apply any completed background batches first. This happens even
        // on cycles that otherwise skip, so results are never stranded.
        self.apply_background_results(host, now, &mut stats);

        let Some(observer) = host.observation_point() else {
            trace!("observation point unresolved, skipping cycle");
            self.last_cycle_at = Some(now);
            return stats;
        };

        if !self.forced
            && let Some(prev) = self.last_observer_pos
            && (observer - prev).length_squared() < self.options.move_epsilon_sq
        {
            trace!("observer stationary, skipping cycle");
            self.last_cycle_at = Some(now);
            return stats;
        }

        self.forced = false;
        self.last_observer_pos = Some(observer);
        self.last_cycle_at = Some(now);
        stats.ran = true;

        let batch = self.drain_due(host, now, &mut stats);

        if let Some(pipeline) = &mut self.pipeline {
            if !batch.is_empty() && pipeline.submit(observer, batch).is_none() {
                // Queue full or shut down; the entities stay registered
                // and are retried next cycle.
                debug!("background pipeline refused batch");
            }
        } else {
            let mut evaluations: Vec<(EntityId, f32, usize)> = batch
                .into_iter()
                .map(|(id, pos)| {
                    let distance = (pos - observer).length();
                    (id, distance, self.policy.select_level(distance))
                })
                .collect();
            // Closest first: near objects are the most visually
            // significant and the most likely to need a different level.
            evaluations.sort_by(|a, b| {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
            });
            self.apply_evaluations(&evaluations, host, now, &mut stats);
        }

        debug!(
            evaluated = stats.evaluated,
            transitions = stats.transitions,
            skipped = stats.skipped,
            "cycle complete"
        );
        stats
    }

    /// Pop up to `max_objects_per_cycle` due entities off the queue head,
    /// snapshot their positions, and re-enqueue them at the tail.
    fn drain_due<H: ScenePositions>(
        &mut self,
        host: &H,
        now: Instant,
        stats: &mut CycleStats,
    ) -> Vec<(EntityId, Vec3)> {
        let budget = self.options.max_objects_per_cycle;
        let mut batch = Vec::new();
        let mut requeue = Vec::new();

        for _ in 0..self.queue.len() {
            if batch.len() >= budget {
                break;
            }
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            let Some(entity) = self.entities.get(&id) else {
                // Unregistered; drop the stale slot.
                continue;
            };
            if now < entity.next_update_at() {
                requeue.push(id);
                continue;
            }
            match host.world_position(id) {
                Some(pos) => {
                    batch.push((id, pos));
                    requeue.push(id);
                }
                None => {
                    // The scene object is gone; tear the entity down and
                    // move on. One dead entity never aborts the cycle.
                    debug!(entity = id.0, "scene object destroyed, dropping entity");
                    self.entities.remove(&id);
                    stats.skipped += 1;
                }
            }
        }

        self.queue.extend(requeue);
        batch
    }

    /// Drain completed background batches and commit their transitions on
    /// this thread.
    fn apply_background_results<H: RenderSink>(
        &mut self,
        host: &mut H,
        now: Instant,
        stats: &mut CycleStats,
    ) {
        let Some(pipeline) = &mut self.pipeline else {
            return;
        };
        let results = pipeline.drain();
        for result in results {
            self.apply_evaluations(&result.levels, host, now, stats);
        }
    }

    /// Commit one batch of `(entity, distance, target level)` evaluations,
    /// already sorted closest-first.
    fn apply_evaluations<H: RenderSink>(
        &mut self,
        evaluations: &[(EntityId, f32, usize)],
        host: &mut H,
        now: Instant,
        stats: &mut CycleStats,
    ) {
        let Self {
            entities,
            observers,
            options,
            ..
        } = self;
        for &(id, distance, target) in evaluations {
            let Some(entity) = entities.get_mut(&id) else {
                // Unregistered between snapshot and application.
                continue;
            };
            stats.evaluated += 1;
            match entity.evaluate(target, distance, host, observers) {
                Ok(true) => stats.transitions += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(entity = id.0, %err, "swap failed, entity skipped");
                    stats.skipped += 1;
                }
            }
            entity.set_next_update_at(now + options.update_interval);
        }
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use strata_scene::MemoryScene;

    use crate::entity::LodState;

    fn mesh(triangles: usize) -> Arc<MeshData> {
        let positions: Vec<Vec3> = (0..triangles + 2)
            .map(|i| Vec3::new(i as f32 * 0.01, (i % 2) as f32 * 0.01, 0.0))
            .collect();
        let indices = (0..triangles)
            .map(|i| [i as u32, i as u32 + 1, i as u32 + 2])
            .collect();
        Arc::new(MeshData::new("scheduled", positions, indices))
    }

    /// Scheduler with a zero interval so every tick is due, 100m range,
    /// 3 reduced levels.
    fn scheduler() -> UpdateScheduler {
        UpdateScheduler::new(
            LodPolicy::linear(100.0, 3, 1.0),
            ProfileParams::default(),
            SchedulerOptions {
                update_interval: Duration::ZERO,
                ..Default::default()
            },
        )
    }

    fn register_at(
        scheduler: &mut UpdateScheduler,
        scene: &mut MemoryScene,
        source: &Arc<MeshData>,
        position: Vec3,
        now: Instant,
    ) -> EntityId {
        let id = EntityId::next();
        scene.set_position(id, position);
        scheduler
            .register(id, MeshId::next(), source, None, Vec::new(), now)
            .unwrap();
        id
    }

    /// The first completed cycle moves entities from Pending to the level
    /// their distance selects.
    #[test]
    fn test_first_cycle_activates_entities() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(30);
        let near = register_at(&mut scheduler, &mut scene, &source, Vec3::new(10.0, 0.0, 0.0), now);
        let far = register_at(&mut scheduler, &mut scene, &source, Vec3::new(500.0, 0.0, 0.0), now);

        let stats = scheduler.tick(&mut scene, now);
        assert!(stats.ran);
        assert_eq!(stats.transitions, 2);
        assert_eq!(scheduler.entity(near).unwrap().state(), LodState::Active(0));
        assert_eq!(scheduler.entity(far).unwrap().state(), LodState::Active(3));
        assert!(scene.active_mesh(near).is_some());
    }

    /// While the observation point is unresolved, cycles skip and entities
    /// stay pending.
    #[test]
    fn test_unresolved_observer_keeps_entities_pending() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        let now = Instant::now();
        let source = mesh(12);
        let id = register_at(&mut scheduler, &mut scene, &source, Vec3::X, now);

        let stats = scheduler.tick(&mut scene, now);
        assert!(!stats.ran);
        assert_eq!(scheduler.entity(id).unwrap().state(), LodState::Pending);

        scene.set_observer(Some(Vec3::ZERO));
        scheduler.tick(&mut scene, now + Duration::from_millis(1));
        assert_eq!(scheduler.entity(id).unwrap().state(), LodState::Active(0));
    }

    /// An observer that moved less than epsilon triggers zero
    /// recomputation: no position queries, no swaps.
    #[test]
    fn test_stationary_observer_skips_cycle() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        register_at(&mut scheduler, &mut scene, &source, Vec3::new(20.0, 0.0, 0.0), now);
        scheduler.tick(&mut scene, now);

        // Move by less than sqrt(0.1) and tick again.
        scene.set_observer(Some(Vec3::new(0.1, 0.0, 0.0)));
        scene.reset_counters();
        let stats = scheduler.tick(&mut scene, now + Duration::from_millis(1));
        assert!(!stats.ran);
        assert_eq!(stats.evaluated, 0);
        assert_eq!(scene.position_queries(), 0);
        assert_eq!(scene.mesh_swaps(), 0);
    }

    /// A forced update overrides the stationary-observer skip.
    #[test]
    fn test_forced_update_overrides_skip() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        register_at(&mut scheduler, &mut scene, &source, Vec3::new(20.0, 0.0, 0.0), now);
        scheduler.tick(&mut scene, now);

        scheduler.force_update();
        let stats = scheduler.tick(&mut scene, now + Duration::from_millis(1));
        assert!(stats.ran);
        assert_eq!(stats.evaluated, 1);
        // Same distance, same level: the swap is a no-op.
        assert_eq!(stats.transitions, 0);
    }

    /// Two entities sharing one source mesh invoke the simplifier exactly
    /// once per reduced level, not twice.
    #[test]
    fn test_shared_mesh_generates_profile_once() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(30);
        let shared = MeshId::next();
        for x in [10.0, 60.0] {
            let id = EntityId::next();
            scene.set_position(id, Vec3::new(x, 0.0, 0.0));
            scheduler
                .register(id, shared, &source, None, Vec::new(), now)
                .unwrap();
        }
        scheduler.tick(&mut scene, now);
        assert_eq!(scheduler.cache().simplify_invocations(), 3);
        assert_eq!(scheduler.cache().len(), 1);
    }

    /// Within a cycle, transitions are committed closest-first.
    #[test]
    fn test_transitions_applied_closest_first() {
        let mut scheduler = scheduler();
        let order: Rc<RefCell<Vec<EntityId>>> = Rc::default();
        let sink = Rc::clone(&order);
        scheduler.subscribe(Box::new(move |id, _, _| sink.borrow_mut().push(id)));

        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        let far = register_at(&mut scheduler, &mut scene, &source, Vec3::new(90.0, 0.0, 0.0), now);
        let near = register_at(&mut scheduler, &mut scene, &source, Vec3::new(30.0, 0.0, 0.0), now);

        scheduler.tick(&mut scene, now);
        assert_eq!(order.borrow().as_slice(), &[near, far]);
    }

    /// A registered entity whose scene object was destroyed is dropped
    /// without disturbing the rest of the batch.
    #[test]
    fn test_destroyed_entity_skipped() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        let doomed = register_at(&mut scheduler, &mut scene, &source, Vec3::X, now);
        let survivor =
            register_at(&mut scheduler, &mut scene, &source, Vec3::new(10.0, 0.0, 0.0), now);
        scene.remove_entity(doomed);

        let stats = scheduler.tick(&mut scene, now);
        assert_eq!(stats.skipped, 1);
        assert_eq!(scheduler.registered_count(), 1);
        assert_eq!(
            scheduler.entity(survivor).unwrap().state(),
            LodState::Active(0)
        );
    }

    /// With a one-entity budget, successive cycles round-robin through the
    /// registration set; nobody starves.
    #[test]
    fn test_round_robin_under_budget() {
        let mut scheduler = UpdateScheduler::new(
            LodPolicy::linear(100.0, 3, 1.0),
            ProfileParams::default(),
            SchedulerOptions {
                update_interval: Duration::ZERO,
                max_objects_per_cycle: 1,
                ..Default::default()
            },
        );
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        let a = register_at(&mut scheduler, &mut scene, &source, Vec3::new(10.0, 0.0, 0.0), now);
        let b = register_at(&mut scheduler, &mut scene, &source, Vec3::new(50.0, 0.0, 0.0), now);

        scheduler.tick(&mut scene, now);
        assert_eq!(scheduler.entity(a).unwrap().state(), LodState::Active(0));
        assert_eq!(scheduler.entity(b).unwrap().state(), LodState::Pending);

        scheduler.force_update();
        scheduler.tick(&mut scene, now + Duration::from_millis(1));
        assert_eq!(scheduler.entity(b).unwrap().state(), LodState::Active(1));
    }

    /// Registration of a geometry-less mesh is rejected and the scheduler
    /// stays usable.
    #[test]
    fn test_empty_mesh_registration_rejected() {
        let mut scheduler = scheduler();
        let source = Arc::new(MeshData::new("empty", Vec::new(), Vec::new()));
        let result = scheduler.register(
            EntityId::next(),
            MeshId::next(),
            &source,
            None,
            Vec::new(),
            Instant::now(),
        );
        assert!(matches!(result, Err(LodError::EmptyMesh(_))));
        assert_eq!(scheduler.registered_count(), 0);
    }

    /// Unregistering drops the entity; its stale queue slot is skipped.
    #[test]
    fn test_unregister_drops_entity() {
        let mut scheduler = scheduler();
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        let id = register_at(&mut scheduler, &mut scene, &source, Vec3::X, now);
        scheduler.unregister(id);
        let stats = scheduler.tick(&mut scene, now);
        assert_eq!(stats.evaluated, 0);
        assert!(scheduler.entity(id).is_none());
    }

    /// The background pipeline computes levels off-thread and the next
    /// cycles apply them on the calling thread.
    #[test]
    fn test_background_compute_applies_results() {
        let mut scheduler = UpdateScheduler::new(
            LodPolicy::linear(100.0, 3, 1.0),
            ProfileParams::default(),
            SchedulerOptions {
                update_interval: Duration::ZERO,
                background_compute: true,
                ..Default::default()
            },
        );
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        let id = register_at(&mut scheduler, &mut scene, &source, Vec3::new(50.0, 0.0, 0.0), now);

        // First tick snapshots and submits; later ticks drain and apply.
        scheduler.tick(&mut scene, now);
        let start = Instant::now();
        while scheduler.entity(id).unwrap().state() == LodState::Pending {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "background result never applied"
            );
            std::thread::sleep(Duration::from_millis(1));
            scheduler.tick(&mut scene, Instant::now());
        }
        assert_eq!(scheduler.entity(id).unwrap().state(), LodState::Active(1));
    }

    /// Shutdown with work in flight leaves the registration set intact.
    #[test]
    fn test_shutdown_preserves_registration() {
        let mut scheduler = UpdateScheduler::new(
            LodPolicy::linear(100.0, 3, 1.0),
            ProfileParams::default(),
            SchedulerOptions {
                update_interval: Duration::ZERO,
                background_compute: true,
                ..Default::default()
            },
        );
        let mut scene = MemoryScene::new();
        scene.set_observer(Some(Vec3::ZERO));
        let now = Instant::now();
        let source = mesh(12);
        register_at(&mut scheduler, &mut scene, &source, Vec3::X, now);
        scheduler.tick(&mut scene, now);
        scheduler.shutdown();
        assert_eq!(scheduler.registered_count(), 1);
    }
}
