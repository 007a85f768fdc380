//! ECS systems.

pub mod transform;

pub use transform::transform_system;
