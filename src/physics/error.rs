//! Errors reported by the collision world.

use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("entity {0:?} has no {1} component")]
    MissingComponent(hecs::Entity, &'static str),

    #[error("entity {0:?} is not registered with the collision world")]
    NotRegistered(hecs::Entity),

    #[error("entity {0:?} is already registered with the collision world")]
    AlreadyRegistered(hecs::Entity),

    #[error("entity {0:?} is not a ghost object")]
    NotAGhost(hecs::Entity),

    #[error("bounds {min} .. {max} of entity {entity:?} lie outside the broadphase world")]
    OutOfWorldBounds {
        entity: hecs::Entity,
        min: Vec3,
        max: Vec3,
    },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
