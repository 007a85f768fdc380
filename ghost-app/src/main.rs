use anyhow::Context;
use glam::Vec3;
use rein_ghost::ecs::components::physics::{Collider, ColliderShape, CollisionObject};
use rein_ghost::ecs::components::transform::{GlobalTransform, Transform};
use rein_ghost::engine::{run_headless, App, GameLoopConfig, SystemContext};
use rein_ghost::physics::{CollisionConfig, CollisionWorld};

const CAPSULE_RADIUS: f32 = 0.25;
const CAPSULE_HEIGHT: f32 = 1.0;
const DEFAULT_FRAMES: u64 = 120;
/// Ground top is at y = 0.5, so the capsule bottom starts 0.7 deep.
const GHOST_START: Vec3 = Vec3::new(0.0, 0.3, 0.0);

/// A capsule ghost spawned sunk into the ground, pushed up until it rests on top.
struct GhostObjectDemo {
    collision: CollisionWorld,
    ghost: Option<hecs::Entity>,
    recoveries: u32,
}

impl GhostObjectDemo {
    fn new() -> Self {
        Self {
            collision: CollisionWorld::new(CollisionConfig::default()),
            ghost: None,
            recoveries: 0,
        }
    }

    fn ghost_position(&self, world: &hecs::World) -> Option<Vec3> {
        let ghost = self.ghost?;
        world
            .get::<&GlobalTransform>(ghost)
            .ok()
            .map(|t| t.translation())
    }
}

impl App for GhostObjectDemo {
    fn init(&mut self, world: &mut hecs::World) -> anyhow::Result<()> {
        // Ground: 20 x 1 x 20 box centered on the origin
        let ground = world.spawn((
            Transform::identity(),
            GlobalTransform::default(),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(10.0, 0.5, 10.0),
            }),
        ));
        self.collision
            .add_collision_object(world, ground, CollisionObject::new_static())?;

        let ghost = world.spawn((
            Transform::from_position(GHOST_START),
            GlobalTransform::from_position(GHOST_START),
            Collider::new(ColliderShape::capsule_with_total_height(
                CAPSULE_RADIUS,
                CAPSULE_HEIGHT,
            )),
        ));
        self.collision.add_ghost_object(world, ghost)?;
        self.ghost = Some(ghost);

        log::info!("ghost object demo ready: ground {ground:?}, ghost {ghost:?}");
        Ok(())
    }

    fn update(&mut self, world: &mut hecs::World, ctx: &SystemContext) -> anyhow::Result<()> {
        let ghost = self.ghost.context("update before init")?;

        // Not using dynamics, so update the collision world manually
        self.collision.perform_discrete_collision_detection(world)?;

        if self.collision.num_overlapping_pairs(world, ghost)? > 0 {
            let correction = self.collision.recover_from_penetration(world, ghost)?;
            if correction != Vec3::ZERO {
                self.recoveries += 1;
                log::debug!("frame {}: corrected by {correction}", ctx.frame);
            }
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let frames = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u64>()
            .with_context(|| format!("invalid frame count {arg:?}"))?,
        None => DEFAULT_FRAMES,
    };

    let config = GameLoopConfig::default();
    let frame_time = config.fixed_timestep;
    let mut world = hecs::World::new();
    let mut app = GhostObjectDemo::new();
    run_headless(config, &mut app, &mut world, frames, frame_time)?;

    let position = app
        .ghost_position(&world)
        .context("ghost entity disappeared")?;
    log::info!(
        "ghost settled at {position} after {} corrections in {frames} frames",
        app.recoveries
    );
    Ok(())
}
