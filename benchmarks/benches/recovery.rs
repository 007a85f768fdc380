//! Collision and penetration recovery benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench recovery
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench recovery -- broadphase

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::Vec3;
use rein_ghost::ecs::components::physics::{Collider, ColliderShape, CollisionObject};
use rein_ghost::ecs::components::transform::{GlobalTransform, Transform};
use rein_ghost::physics::contact::{ManifoldPoint, PersistentManifold};
use rein_ghost::physics::dispatcher::{AlgorithmKind, CollisionAlgorithm};
use rein_ghost::physics::narrowphase::convex_convex;
use rein_ghost::physics::pair_cache::BroadphasePair;
use rein_ghost::physics::recovery::compute_correction;
use rein_ghost::physics::CollisionWorld;

/// Deterministic pseudo-random in [0, 1).
fn lcg(seed: &mut u64) -> f32 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((*seed >> 33) as f32) / (1u64 << 31) as f32
}

fn overlap_set(pairs: usize, points_per_manifold: usize) -> (Vec<BroadphasePair>, hecs::Entity) {
    let mut world = hecs::World::new();
    let ghost = world.spawn((0u8,));
    let mut seed = 7;

    let set = (0..pairs)
        .map(|i| {
            let other = world.spawn((i,));
            let points = (0..points_per_manifold)
                .map(|_| {
                    let normal = Vec3::new(lcg(&mut seed) - 0.5, lcg(&mut seed), lcg(&mut seed) - 0.5)
                        .normalize_or_zero();
                    ManifoldPoint::new(normal, -0.1 * lcg(&mut seed))
                })
                .collect();
            let (a, b) = if i % 2 == 0 { (ghost, other) } else { (other, ghost) };
            BroadphasePair {
                proxy0: a,
                proxy1: b,
                algorithm: Some(CollisionAlgorithm::with_manifold(
                    AlgorithmKind::ConvexConvex,
                    PersistentManifold::with_points(a, b, points),
                )),
            }
        })
        .collect();
    (set, ghost)
}

fn setup_crowd(n: usize) -> (hecs::World, CollisionWorld, hecs::Entity) {
    let mut world = hecs::World::new();
    let mut physics = CollisionWorld::default();
    let mut seed = 42;

    let ground = world.spawn((
        Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        GlobalTransform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        Collider::new(ColliderShape::Box {
            half_extents: Vec3::new(50.0, 0.5, 50.0),
        }),
    ));
    physics
        .add_collision_object(&mut world, ground, CollisionObject::new_static())
        .unwrap();

    for _ in 0..n {
        let position = Vec3::new(
            lcg(&mut seed) * 40.0 - 20.0,
            lcg(&mut seed) * 2.0,
            lcg(&mut seed) * 40.0 - 20.0,
        );
        let entity = world.spawn((
            Transform::from_position(position),
            GlobalTransform::from_position(position),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        ));
        physics
            .add_collision_object(&mut world, entity, CollisionObject::new_dynamic())
            .unwrap();
    }

    let ghost = world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.3, 0.0)),
        GlobalTransform::from_position(Vec3::new(0.0, 0.3, 0.0)),
        Collider::new(ColliderShape::capsule_with_total_height(0.25, 1.0)),
    ));
    physics.add_ghost_object(&mut world, ghost).unwrap();

    (world, physics, ghost)
}

// ---------------------------------------------------------------------------
// Correction
// ---------------------------------------------------------------------------

fn bench_compute_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery/compute_correction");
    for &n in &[1, 16, 256] {
        let (set, ghost) = overlap_set(n, 4);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| compute_correction(&set, ghost));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Collision world
// ---------------------------------------------------------------------------

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("world/discrete_detection");
    for &n in &[100, 500, 1000] {
        let (world, mut physics, _) = setup_crowd(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| physics.perform_discrete_collision_detection(&world).unwrap());
        });
    }
    group.finish();
}

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("world/recover_from_penetration");
    for &n in &[100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let (world, mut physics, ghost) = setup_crowd(n);
                    physics.perform_discrete_collision_detection(&world).unwrap();
                    (world, physics, ghost)
                },
                |(world, mut physics, ghost)| physics.recover_from_penetration(&world, ghost).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_capsule_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrowphase/capsule_box");
    let ground = ColliderShape::Box {
        half_extents: Vec3::new(10.0, 0.5, 10.0),
    };
    let capsule = ColliderShape::capsule_with_total_height(0.25, 1.0);
    let tg = GlobalTransform::from_position(Vec3::new(0.0, -0.5, 0.0));

    let sunk = GlobalTransform::from_position(Vec3::new(0.0, 0.3, 0.0));
    group.bench_function("penetrating", |b| {
        b.iter(|| convex_convex(&ground, &tg, &capsule, &sunk));
    });

    let above = GlobalTransform::from_position(Vec3::new(0.0, 2.0, 0.0));
    group.bench_function("separated", |b| {
        b.iter(|| convex_convex(&ground, &tg, &capsule, &above));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compute_correction,
    bench_detection,
    bench_recover,
    bench_capsule_box,
);
criterion_main!(benches);
