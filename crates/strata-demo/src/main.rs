//! Headless demo binary for the Strata LOD layer.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p strata-demo` to walk through the level
//! policy, the simplifier, the profile cache, and a live scheduler
//! simulation with a moving observer.
//! Run with `cargo run -p strata-demo -- --levels 6 --bias 2.0` to override
//! settings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::info;

use strata_config::{CliArgs, Config};
use strata_lod::{
    AuxElement, LodPolicy, ProfileCache, ProfileParams, SchedulerOptions, UpdateScheduler,
};
use strata_materials::{MaterialDesc, TextureData};
use strata_mesh::{MeshData, MeshId, SimplifyStrategy, simplify};
use strata_scene::{AuxKind, EntityId, MemoryScene};

/// Build a flat grid mesh of `size` x `size` quads with UVs, centered at the
/// origin.
fn build_grid_mesh(name: &str, size: u32) -> MeshData {
    let verts_per_axis = size + 1;
    let half = size as f32 / 2.0;
    let mut positions = Vec::with_capacity((verts_per_axis * verts_per_axis) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());
    for z in 0..verts_per_axis {
        for x in 0..verts_per_axis {
            positions.push(Vec3::new(x as f32 - half, 0.0, z as f32 - half));
            uvs.push(Vec2::new(
                x as f32 / size as f32,
                z as f32 / size as f32,
            ));
        }
    }

    let mut indices = Vec::with_capacity((size * size * 2) as usize);
    for z in 0..size {
        for x in 0..size {
            let i = z * verts_per_axis + x;
            indices.push([i, i + verts_per_axis, i + 1]);
            indices.push([i + 1, i + verts_per_axis, i + verts_per_axis + 1]);
        }
    }

    let mut mesh = MeshData::new(name, positions, indices);
    mesh.uvs = uvs;
    mesh.recompute_normals();
    mesh.recompute_tangents();
    mesh
}

/// Demonstrates distance-to-level selection across the configured range.
fn demonstrate_level_policy(config: &Config) -> LodPolicy {
    info!("Starting level policy demonstration");

    let policy = LodPolicy::linear(
        config.lod.max_distance,
        config.lod.level_count,
        config.lod.bias,
    );

    let steps = 8;
    for i in 0..=steps {
        let d = config.lod.max_distance * 1.2 * i as f32 / steps as f32;
        info!(
            "  distance {:.1} -> level {} (activates at {:.1})",
            d,
            policy.select_level(d),
            policy.activation_distance(policy.select_level(d)),
        );
    }

    info!(
        "Policy: {} reduced levels over {:.0} units, bias {:.2}",
        policy.max_level(),
        config.lod.max_distance,
        policy.bias(),
    );
    info!("Level policy demonstration completed successfully");
    policy
}

/// Demonstrates mesh simplification with both retention strategies.
fn demonstrate_simplification(config: &Config) {
    info!("Starting mesh simplification demonstration");

    let source = build_grid_mesh("terrain_patch", 16);
    info!(
        "Source mesh '{}': {} triangles, {} vertices",
        source.name,
        source.triangle_count(),
        source.positions.len(),
    );

    for ratio in [0.25, 0.5, 0.9] {
        let truncated = simplify(&source, ratio, &SimplifyStrategy::Truncate);
        let preserved = simplify(
            &source,
            ratio,
            &SimplifyStrategy::EdgePreserving {
                edge_threshold: config.lod.edge_threshold,
            },
        );
        info!(
            "  ratio {:.2}: truncate -> {} tris ('{}'), edge-preserving -> {} tris",
            ratio,
            truncated.triangle_count(),
            truncated.name,
            preserved.triangle_count(),
        );
    }

    info!("Mesh simplification demonstration completed successfully");
}

/// Demonstrates profile generation and cache idempotence.
fn demonstrate_profile_cache(config: &Config, policy: &LodPolicy) {
    info!("Starting profile cache demonstration");

    let mut cache = ProfileCache::new();
    let params = profile_params(config);
    let source = Arc::new(build_grid_mesh("rock_formation", 12));
    let material = Arc::new(MaterialDesc {
        name: "rock".to_string(),
        texture: Some(TextureData::solid("rock_albedo", 256, 256, [120, 110, 100, 255])),
        ..Default::default()
    });

    let mesh_id = MeshId::next();
    let profile = cache
        .get_or_create(mesh_id, &source, Some(&material), policy, &params)
        .expect("demo mesh has geometry");

    for i in 0..profile.len() {
        let level = profile.level(i).expect("level in range");
        let tex = level
            .material
            .as_ref()
            .and_then(|m| m.texture.as_ref())
            .map(|t| t.dimensions());
        info!(
            "  level {}: {} tris, activates at {:.1}, texture {:?}",
            i, level.triangle_count, level.threshold, tex,
        );
    }

    // A second request is served from the cache without re-simplifying.
    let invocations = cache.simplify_invocations();
    let again = cache
        .get_or_create(mesh_id, &source, Some(&material), policy, &params)
        .expect("cache hit");
    info!(
        "Cache hit: shared profile = {}, simplifier calls still {}",
        Arc::ptr_eq(&profile, &again),
        cache.simplify_invocations() == invocations,
    );

    info!("Profile cache demonstration completed successfully");
}

/// Runs the scheduler against an in-memory scene with a moving observer.
fn run_scene_simulation(config: &Config, policy: LodPolicy) {
    info!("Starting scene simulation");

    let interval = Duration::from_millis(config.schedule.update_interval_ms);
    let mut scheduler = UpdateScheduler::new(
        policy,
        profile_params(config),
        SchedulerOptions {
            update_interval: interval,
            max_objects_per_cycle: config.schedule.max_objects_per_cycle,
            move_epsilon_sq: config.schedule.move_epsilon_sq,
            background_compute: config.schedule.background_compute,
            background_workers: 1,
        },
    );

    let transitions = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let counter = Arc::clone(&transitions);
    scheduler.subscribe(Box::new(move |_, _, _| {
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }));

    let mut scene = MemoryScene::new();
    let mut rng = Xoshiro256StarStar::seed_from_u64(42); // Fixed seed for reproducible demo

    // Three source meshes shared by 200 entities scattered over the field.
    let sources: Vec<(MeshId, Arc<MeshData>)> = [
        ("boulder", 8u32),
        ("tree_canopy", 12),
        ("ruin_wall", 16),
    ]
    .into_iter()
    .map(|(name, size)| (MeshId::next(), Arc::new(build_grid_mesh(name, size))))
    .collect();

    let now = Instant::now();
    let field = config.lod.max_distance * 3.0;
    for i in 0..200_usize {
        let id = EntityId::next();
        let position = Vec3::new(
            rng.gen_range(0.0..field),
            0.0,
            rng.gen_range(-field / 4.0..field / 4.0),
        );
        scene.set_position(id, position);

        let (mesh_id, source) = &sources[i % sources.len()];
        // Every third entity carries a light that turns off past 40 units.
        let aux = if i % 3 == 0 {
            vec![AuxElement {
                kind: AuxKind::Light,
                enable_within: 40.0,
            }]
        } else {
            Vec::new()
        };
        scheduler
            .register(id, *mesh_id, source, None, aux, now)
            .expect("demo meshes have geometry");
    }
    info!(
        "Registered {} entities sharing {} meshes ({} simplifier calls)",
        scheduler.registered_count(),
        scheduler.cache().len(),
        scheduler.cache().simplify_invocations(),
    );

    // Walk the observer across the field, one cycle per interval.
    let cycles = 12;
    let step = field / cycles as f32;
    for cycle in 0..cycles {
        scene.set_observer(Some(Vec3::new(step * cycle as f32, 1.8, 0.0)));
        let stats = scheduler.tick(&mut scene, Instant::now());
        if stats.ran || config.debug.log_cycle_stats {
            info!(
                "  cycle {}: evaluated {}, transitions {}, skipped {}",
                cycle, stats.evaluated, stats.transitions, stats.skipped,
            );
        }
        std::thread::sleep(interval);
    }

    // A stationary observer skips cycles until an update is forced.
    let skipped = scheduler.tick(&mut scene, Instant::now());
    scheduler.force_update();
    std::thread::sleep(interval);
    let forced = scheduler.tick(&mut scene, Instant::now());
    info!(
        "Stationary observer: skipped cycle ran = {}, forced cycle ran = {}",
        skipped.ran, forced.ran,
    );

    info!(
        "Simulation: {} committed transitions, {} position queries, {} mesh swaps, {} light toggles",
        transitions.load(std::sync::atomic::Ordering::Relaxed),
        scene.position_queries(),
        scene.mesh_swaps(),
        scene.component_toggles(),
    );
    scheduler.shutdown();
    info!("Scene simulation completed successfully");
}

fn profile_params(config: &Config) -> ProfileParams {
    ProfileParams {
        max_reduction_ratio: config.lod.max_reduction_ratio,
        strategy: if config.lod.edge_preserving {
            SimplifyStrategy::EdgePreserving {
                edge_threshold: config.lod.edge_threshold,
            }
        } else {
            SimplifyStrategy::Truncate
        },
        scale_textures: config.lod.scale_textures,
    }
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(Config::default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    let config = config.validated();

    strata_log::init_logging(Some(&config));

    let policy = demonstrate_level_policy(&config);

    demonstrate_simplification(&config);

    demonstrate_profile_cache(&config, &policy);

    run_scene_simulation(&config, policy);
}
