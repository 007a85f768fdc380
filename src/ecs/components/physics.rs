//! Collision components for ECS entities.

use std::ops::{BitOr, BitOrAssign};

use glam::Vec3;

/// Collider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Capsule along the local Y axis. `half_height` excludes the hemispherical caps.
    Capsule { radius: f32, half_height: f32 },
    /// Cylinder along the local Y axis.
    Cylinder { radius: f32, half_height: f32 },
    ConvexHull { points: Vec<Vec3> },
}

impl ColliderShape {
    /// Y-aligned capsule whose overall height (caps included) is `total_height`.
    pub fn capsule_with_total_height(radius: f32, total_height: f32) -> Self {
        ColliderShape::Capsule {
            radius,
            half_height: ((total_height - 2.0 * radius) * 0.5).max(0.0),
        }
    }
}

/// Collision detection component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Sphere { radius: 0.5 },
            offset: Vec3::ZERO,
        }
    }
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
        }
    }
}

/// Behavior flags of a collision object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionFlags(pub u32);

impl CollisionFlags {
    pub const NONE: Self = Self(0);
    /// Never moves. Static-static pairs are never reported by the broadphase.
    pub const STATIC_OBJECT: Self = Self(1);
    /// Moved by user code rather than by a solver.
    pub const KINEMATIC_OBJECT: Self = Self(1 << 1);
    /// Reports overlaps but takes part in no contact response.
    pub const NO_CONTACT_RESPONSE: Self = Self(1 << 2);
    /// Character proxy (the ghost capsule of a character controller).
    pub const CHARACTER_OBJECT: Self = Self(1 << 4);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC_OBJECT)
    }
}

impl BitOr for CollisionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Broadphase filter group bits.
pub struct CollisionFilterGroups;

impl CollisionFilterGroups {
    pub const DEFAULT: u16 = 1;
    pub const STATIC: u16 = 1 << 1;
    pub const KINEMATIC: u16 = 1 << 2;
    pub const DEBRIS: u16 = 1 << 3;
    pub const SENSOR_TRIGGER: u16 = 1 << 4;
    pub const CHARACTER: u16 = 1 << 5;
    pub const ALL: u16 = u16::MAX;
}

/// Registration data for an entity taking part in collision detection.
///
/// Added by [`CollisionWorld`](crate::physics::CollisionWorld) when an entity is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionObject {
    pub flags: CollisionFlags,
    pub filter_group: u16,
    pub filter_mask: u16,
}

impl CollisionObject {
    pub fn new_static() -> Self {
        Self {
            flags: CollisionFlags::STATIC_OBJECT,
            filter_group: CollisionFilterGroups::STATIC,
            filter_mask: CollisionFilterGroups::ALL ^ CollisionFilterGroups::STATIC,
        }
    }

    pub fn new_dynamic() -> Self {
        Self {
            flags: CollisionFlags::NONE,
            filter_group: CollisionFilterGroups::DEFAULT,
            filter_mask: CollisionFilterGroups::ALL,
        }
    }

    /// Flags for a character ghost: overlap tracking only, no contact response.
    pub fn new_ghost() -> Self {
        Self {
            flags: CollisionFlags::NO_CONTACT_RESPONSE | CollisionFlags::CHARACTER_OBJECT,
            filter_group: CollisionFilterGroups::CHARACTER,
            filter_mask: CollisionFilterGroups::ALL,
        }
    }

    /// Both objects must accept each other's group for a pair to exist.
    #[inline]
    pub fn should_collide(&self, other: &CollisionObject) -> bool {
        (self.filter_group & other.filter_mask) != 0 && (other.filter_group & self.filter_mask) != 0
    }

    pub fn has_contact_response(&self) -> bool {
        !self.flags.contains(CollisionFlags::NO_CONTACT_RESPONSE)
    }
}

impl Default for CollisionObject {
    fn default() -> Self {
        Self::new_dynamic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_total_height() {
        let shape = ColliderShape::capsule_with_total_height(0.25, 1.0);
        assert_eq!(
            shape,
            ColliderShape::Capsule {
                radius: 0.25,
                half_height: 0.25
            }
        );

        // Shorter than two caps degenerates into a sphere-like capsule
        let shape = ColliderShape::capsule_with_total_height(0.5, 0.5);
        assert_eq!(
            shape,
            ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.0
            }
        );
    }

    #[test]
    fn test_flags() {
        let flags = CollisionFlags::NO_CONTACT_RESPONSE | CollisionFlags::CHARACTER_OBJECT;
        assert!(flags.contains(CollisionFlags::CHARACTER_OBJECT));
        assert!(!flags.is_static());
        assert!(!CollisionObject::new_ghost().has_contact_response());
        assert!(CollisionObject::new_static().flags.is_static());
    }

    #[test]
    fn test_filter_masks() {
        let ground = CollisionObject::new_static();
        let other_ground = CollisionObject::new_static();
        let ghost = CollisionObject::new_ghost();

        assert!(ghost.should_collide(&ground));
        assert!(ground.should_collide(&ghost));
        assert!(!ground.should_collide(&other_ground));

        let mut picky = CollisionObject::new_dynamic();
        picky.filter_mask = CollisionFilterGroups::STATIC;
        assert!(!picky.should_collide(&ghost));
        assert!(picky.should_collide(&ground));
    }
}
