//! Transform components for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// Local-space transform. Stores position, rotation, and scale separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Move the transform by a world-space offset.
    #[inline]
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform matrix. Kept in sync with [`Transform`] by
/// [`transform_system`](crate::ecs::systems::transform_system).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    pub fn from_position(position: Vec3) -> Self {
        Self(Mat4::from_translation(position))
    }

    /// World-space origin of this transform.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// Pre-multiply a world-space translation, leaving rotation and scale untouched.
    #[inline]
    pub fn translate(&mut self, offset: Vec3) {
        self.0 = Mat4::from_translation(offset) * self.0;
    }

    /// Same transform shifted by a local-space offset (collider offsets).
    #[inline]
    pub fn with_local_offset(&self, offset: Vec3) -> Self {
        if offset == Vec3::ZERO {
            *self
        } else {
            Self(self.0 * Mat4::from_translation(offset))
        }
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_translate_moves_position_only() {
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        t.rotation = Quat::from_rotation_y(0.3);
        t.translate(Vec3::new(0.0, 0.2, 0.0));
        assert_eq!(t.position, Vec3::new(1.0, 0.2, 0.0));
        assert_eq!(t.rotation, Quat::from_rotation_y(0.3));
    }

    #[test]
    fn test_global_translate_keeps_rotation() {
        let rotation = Quat::from_rotation_z(0.5);
        let mut global = GlobalTransform(Mat4::from_rotation_translation(
            rotation,
            Vec3::new(0.0, 1.0, 0.0),
        ));

        global.translate(Vec3::new(0.0, 0.25, -1.0));

        let (_, r, t) = global.0.to_scale_rotation_translation();
        let eps = 1e-5;
        assert!((t - Vec3::new(0.0, 1.25, -1.0)).length() < eps);
        assert!((r.dot(rotation).abs() - 1.0).abs() < eps);
        assert!((global.translation() - t).length() < eps);
    }

    #[test]
    fn test_local_offset_follows_rotation() {
        let global = GlobalTransform(Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let shifted = global.with_local_offset(Vec3::X);
        assert!((shifted.translation() - Vec3::Y).length() < 1e-5);
        assert_eq!(global.with_local_offset(Vec3::ZERO), global);
    }
}
