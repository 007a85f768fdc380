//! Shape support mapping and bounding boxes.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

/// Axis-aligned bounding box used by the broadphase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Test whether two AABBs overlap. Touching boxes count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Whether `other` lies entirely inside this box.
    #[inline]
    pub fn contains(&self, other: &PhysicsAabb) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

impl ColliderShape {
    /// Farthest point of the shape along `direction`, in world space.
    #[inline]
    pub fn support(&self, direction: Vec3, transform: &GlobalTransform) -> Vec3 {
        let mat = transform.0;
        let local_dir = mat
            .inverse()
            .transform_vector3(direction)
            .normalize_or_zero();

        let local_point = match self {
            ColliderShape::Sphere { radius } => local_dir * *radius,
            ColliderShape::Box { half_extents } => {
                Vec3::select(local_dir.cmpge(Vec3::ZERO), *half_extents, -*half_extents)
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let tip = if local_dir.y >= 0.0 {
                    *half_height
                } else {
                    -*half_height
                };
                Vec3::new(0.0, tip, 0.0) + local_dir * *radius
            }
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => {
                let y = if local_dir.y >= 0.0 {
                    *half_height
                } else {
                    -*half_height
                };
                let radial = Vec3::new(local_dir.x, 0.0, local_dir.z);
                let radial_len = radial.length();
                let rim = if radial_len > 1e-6 {
                    radial * (*radius / radial_len)
                } else {
                    Vec3::ZERO
                };
                Vec3::new(rim.x, y, rim.z)
            }
            ColliderShape::ConvexHull { points } => points
                .iter()
                .copied()
                .max_by(|a, b| a.dot(local_dir).total_cmp(&b.dot(local_dir)))
                .unwrap_or(Vec3::ZERO),
        };

        mat.transform_point3(local_point)
    }

    /// World-space AABB of the shape under `transform`.
    #[inline]
    pub fn compute_aabb(&self, transform: &GlobalTransform) -> PhysicsAabb {
        let mat = transform.0;

        match self {
            ColliderShape::Sphere { radius } => {
                let center = mat.transform_point3(Vec3::ZERO);
                let max_scale = mat
                    .x_axis
                    .truncate()
                    .length()
                    .max(mat.y_axis.truncate().length())
                    .max(mat.z_axis.truncate().length());
                let r = Vec3::splat(*radius * max_scale);
                PhysicsAabb::new(center - r, center + r)
            }
            ColliderShape::Box { half_extents } => aabb_from_extents(*half_extents, mat),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => aabb_from_extents(Vec3::new(*radius, *half_height + *radius, *radius), mat),
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => aabb_from_extents(Vec3::new(*radius, *half_height, *radius), mat),
            ColliderShape::ConvexHull { points } => {
                if points.is_empty() {
                    let center = mat.transform_point3(Vec3::ZERO);
                    return PhysicsAabb::new(center, center);
                }
                points.iter().fold(
                    PhysicsAabb::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                    |acc, p| {
                        let wp = mat.transform_point3(*p);
                        PhysicsAabb::new(acc.min.min(wp), acc.max.max(wp))
                    },
                )
            }
        }
    }
}

/// World-space AABB of an oriented box given its local half-extents.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);
    let extent = mat.x_axis.truncate().abs() * half_extents.x
        + mat.y_axis.truncate().abs() * half_extents.y
        + mat.z_axis.truncate().abs() * half_extents.z;

    PhysicsAabb::new(center - extent, center + extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_sphere_aabb() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let transform = GlobalTransform::from_position(Vec3::new(0.0, 5.0, 0.0));
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-1.0, 4.0, -1.0)).length() < eps);
        assert!((aabb.max - Vec3::new(1.0, 6.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_capsule_aabb_includes_caps() {
        let shape = ColliderShape::Capsule {
            radius: 0.25,
            half_height: 0.25,
        };
        let aabb = shape.compute_aabb(&GlobalTransform::default());

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-0.25, -0.5, -0.25)).length() < eps);
        assert!((aabb.max - Vec3::new(0.25, 0.5, 0.25)).length() < eps);
    }

    #[test]
    fn test_rotated_box_aabb_grows() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::new(1.0, 0.1, 1.0),
        };
        let transform = GlobalTransform(Mat4::from_quat(Quat::from_rotation_z(
            std::f32::consts::FRAC_PI_2,
        )));
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.max - Vec3::new(0.1, 1.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_aabb_overlap_and_contains() {
        let a = PhysicsAabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = PhysicsAabb::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = PhysicsAabb::new(Vec3::splat(2.5), Vec3::splat(3.0));
        let inner = PhysicsAabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(a.contains(&inner));
        assert!(!a.contains(&b));
        assert_eq!(a.center(), Vec3::ZERO);
    }

    #[test]
    fn test_capsule_support() {
        let shape = ColliderShape::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let transform = GlobalTransform::from_position(Vec3::new(2.0, 0.0, 0.0));

        let eps = 1e-5;
        let top = shape.support(Vec3::Y, &transform);
        assert!((top - Vec3::new(2.0, 1.5, 0.0)).length() < eps);
        let side = shape.support(Vec3::X, &transform);
        assert!((side.x - 2.5).abs() < eps);
    }

    #[test]
    fn test_hull_support_picks_extreme_point() {
        let shape = ColliderShape::ConvexHull {
            points: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)],
        };
        let p = shape.support(Vec3::Y, &GlobalTransform::default());
        assert_eq!(p, Vec3::new(0.0, 2.0, 0.0));
    }
}
