//! Game engine module with App trait and a headless game loop.
//!
//! Runs the application callbacks on a fixed-timestep accumulator and keeps
//! world transforms in sync after every frame.

use tracing::{debug, warn};

use crate::ecs::systems::transform_system;

/// Game loop configuration.
#[derive(Debug, Clone)]
pub struct GameLoopConfig {
    /// Fixed timestep for physics (seconds). Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum physics substeps per frame. Default: 4.
    pub max_substeps: u32,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
        }
    }
}

/// System execution context passed to App callbacks.
#[derive(Debug, Clone, Copy)]
pub struct SystemContext {
    /// Time since last frame (seconds).
    pub delta_time: f64,
    /// Fixed timestep interval (seconds).
    pub fixed_delta_time: f64,
    /// Time since application start (seconds).
    pub elapsed_time: f64,
    /// Index of the current frame, starting at 0.
    pub frame: u64,
}

/// Trait for ECS-based applications.
///
/// Implement this trait and pass it to [`run_headless`].
pub trait App {
    /// Called once before the first frame. Set up the ECS world.
    fn init(&mut self, world: &mut hecs::World) -> anyhow::Result<()>;

    /// Called each frame (variable timestep).
    fn update(&mut self, world: &mut hecs::World, ctx: &SystemContext) -> anyhow::Result<()>;

    /// Called at fixed timestep intervals. Use for physics logic. Optional.
    fn fixed_update(&mut self, _world: &mut hecs::World, _dt: f32) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fixed-timestep accumulator shared by every loop driver.
#[derive(Debug, Default)]
struct Stepper {
    accumulator: f64,
}

impl Stepper {
    /// Number of fixed steps to run for a frame of `delta_time` seconds.
    fn advance(&mut self, config: &GameLoopConfig, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= config.fixed_timestep && substeps < config.max_substeps {
            self.accumulator -= config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > config.fixed_timestep * config.max_substeps as f64 {
            warn!(
                accumulator = self.accumulator,
                "frame budget exceeded, dropping accumulated time"
            );
            self.accumulator = 0.0;
        }
        substeps
    }
}

/// Run an application for `frames` frames of `frame_time` seconds each.
///
/// Each frame runs:
/// 1. `App::fixed_update` at fixed timestep intervals
/// 2. `App::update`
/// 3. `transform_system`
pub fn run_headless<A: App>(
    config: GameLoopConfig,
    app: &mut A,
    world: &mut hecs::World,
    frames: u64,
    frame_time: f64,
) -> anyhow::Result<()> {
    app.init(world)?;
    transform_system(world);

    let mut stepper = Stepper::default();
    let mut elapsed_time = 0.0;

    for frame in 0..frames {
        let substeps = stepper.advance(&config, frame_time);
        for _ in 0..substeps {
            app.fixed_update(world, config.fixed_timestep as f32)?;
        }

        elapsed_time += frame_time;
        let ctx = SystemContext {
            delta_time: frame_time,
            fixed_delta_time: config.fixed_timestep,
            elapsed_time,
            frame,
        };
        app.update(world, &ctx)?;

        transform_system(world);
    }

    debug!(frames, elapsed_time, "headless loop finished");
    Ok(())
}
