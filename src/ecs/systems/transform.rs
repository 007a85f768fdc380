//! Transform synchronization system.

use crate::ecs::components::transform::{GlobalTransform, Transform};

/// Write every entity's local [`Transform`] into its [`GlobalTransform`].
///
/// Collision objects are flat (no hierarchy), so local and world space coincide.
pub fn transform_system(world: &mut hecs::World) {
    for (_, (transform, global)) in world.query_mut::<(&Transform, &mut GlobalTransform)>() {
        global.0 = transform.to_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_transform_written_to_global() {
        let mut world = hecs::World::new();

        let pos = Vec3::new(1.0, 2.0, 3.0);
        let entity = world.spawn((Transform::from_position(pos), GlobalTransform::default()));

        transform_system(&mut world);

        let global = world.get::<&GlobalTransform>(entity).unwrap();
        let expected = Mat4::from_translation(pos);
        assert!((global.0.w_axis - expected.w_axis).length() < 1e-5);
    }

    #[test]
    fn test_entities_without_global_untouched() {
        let mut world = hecs::World::new();
        let entity = world.spawn((Transform::from_position(Vec3::ONE),));

        transform_system(&mut world);

        assert!(world.get::<&GlobalTransform>(entity).is_err());
    }
}
