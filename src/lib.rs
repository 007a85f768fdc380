//! Rein ghost collision
//!
//! A collision world with ghost objects that push themselves out of the
//! geometry they sink into.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - hecs ECS integration: transforms and collision components (feature = "ecs")
//! 2. **physics** - Broadphase, narrowphase, ghost objects, penetration recovery (feature = "physics")
//! 3. **engine** - Headless fixed-timestep game loop with App trait (feature = "engine")

#[cfg(feature = "ecs")]
pub mod ecs;

#[cfg(feature = "engine")]
pub mod engine;

#[cfg(feature = "physics")]
pub mod physics;

#[cfg(feature = "ecs")]
pub use ecs::prelude::*;

#[cfg(feature = "engine")]
pub use engine::{run_headless, App, GameLoopConfig, SystemContext};

#[cfg(feature = "physics")]
pub use physics::{
    error::PhysicsError, ghost::GhostObject, pair_cache::BroadphasePair,
    recovery::compute_correction, CollisionConfig, CollisionWorld,
};

// Re-export glam for convenience
pub use glam;
