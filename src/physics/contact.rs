//! Contact data: narrowphase results and persistent manifolds.

use glam::Vec3;

use crate::ecs::components::transform::GlobalTransform;

use super::dispatcher::ManifoldSettings;

/// Raw narrowphase result for a pair of shapes.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B).
    pub normal: Vec3,
    /// Penetration depth (positive when overlapping).
    pub penetration: f32,
    /// Midpoint of the overlap along the normal, in world space.
    pub point: Vec3,
}

impl ContactInfo {
    /// Deepest point of shape A inside shape B.
    #[inline]
    pub fn point_on_a(&self) -> Vec3 {
        self.point + self.normal * (self.penetration * 0.5)
    }

    /// Deepest point of shape B inside shape A.
    #[inline]
    pub fn point_on_b(&self) -> Vec3 {
        self.point - self.normal * (self.penetration * 0.5)
    }
}

/// A single contact point inside a [`PersistentManifold`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// Contact point in body A's local frame.
    pub local_point_a: Vec3,
    /// Contact point in body B's local frame.
    pub local_point_b: Vec3,
    pub position_world_on_a: Vec3,
    pub position_world_on_b: Vec3,
    /// Unit normal on body B, pointing from B towards A.
    pub normal_world_on_b: Vec3,
    /// Signed separation along the normal. Negative means penetration.
    pub distance: f32,
    /// Number of refreshes this point has survived.
    pub lifetime: u32,
}

impl ManifoldPoint {
    /// Bare point with only the fields the penetration recovery reads.
    pub fn new(normal_world_on_b: Vec3, distance: f32) -> Self {
        Self {
            local_point_a: Vec3::ZERO,
            local_point_b: Vec3::ZERO,
            position_world_on_a: Vec3::ZERO,
            position_world_on_b: Vec3::ZERO,
            normal_world_on_b,
            distance,
            lifetime: 0,
        }
    }

    /// Convert a narrowphase result into a manifold point, storing local anchors
    /// so the point can be re-evaluated after either body moves.
    pub fn from_contact(
        info: &ContactInfo,
        transform_a: &GlobalTransform,
        transform_b: &GlobalTransform,
    ) -> Self {
        let world_a = info.point_on_a();
        let world_b = info.point_on_b();
        Self {
            local_point_a: transform_a.0.inverse().transform_point3(world_a),
            local_point_b: transform_b.0.inverse().transform_point3(world_b),
            position_world_on_a: world_a,
            position_world_on_b: world_b,
            normal_world_on_b: -info.normal,
            distance: -info.penetration,
            lifetime: 0,
        }
    }

    #[inline]
    pub fn is_penetrating(&self) -> bool {
        self.distance < 0.0
    }
}

/// Contact points between two bodies that persist across detection passes.
#[derive(Debug, Clone)]
pub struct PersistentManifold {
    pub body_a: hecs::Entity,
    pub body_b: hecs::Entity,
    points: Vec<ManifoldPoint>,
    max_points: usize,
    breaking_threshold: f32,
    merge_threshold: f32,
}

impl PersistentManifold {
    pub fn new(
        body_a: hecs::Entity,
        body_b: hecs::Entity,
        max_points: usize,
        breaking_threshold: f32,
        merge_threshold: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            points: Vec::with_capacity(max_points),
            max_points: max_points.max(1),
            breaking_threshold,
            merge_threshold,
        }
    }

    /// Manifold built directly from points, bypassing narrowphase.
    pub fn with_points(
        body_a: hecs::Entity,
        body_b: hecs::Entity,
        points: Vec<ManifoldPoint>,
    ) -> Self {
        let settings = ManifoldSettings::default();
        Self {
            body_a,
            body_b,
            max_points: points.len().max(settings.max_points),
            points,
            breaking_threshold: settings.breaking_threshold,
            merge_threshold: settings.merge_threshold,
        }
    }

    pub fn num_contacts(&self) -> usize {
        self.points.len()
    }

    pub fn contact_point(&self, index: usize) -> Option<&ManifoldPoint> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    /// Insert a point, merging it with a cached point at nearly the same spot.
    ///
    /// When the manifold is full the least penetrating point is replaced, unless
    /// the new point is shallower still.
    pub fn add_contact_point(&mut self, mut point: ManifoldPoint) {
        let merge_sq = self.merge_threshold * self.merge_threshold;
        let cached = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p.local_point_a - point.local_point_a).length_squared()))
            .filter(|&(_, d)| d < merge_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        if let Some(i) = cached {
            point.lifetime = self.points[i].lifetime + 1;
            self.points[i] = point;
            return;
        }

        if self.points.len() < self.max_points {
            self.points.push(point);
            return;
        }

        if let Some((i, shallowest)) = self
            .points
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
        {
            if point.distance < shallowest.distance {
                self.points[i] = point;
            }
        }
    }

    /// Re-evaluate cached points against the bodies' current transforms.
    ///
    /// Points that separated past the breaking threshold, or slid sideways by
    /// more than it, are dropped.
    pub fn refresh_contact_points(
        &mut self,
        transform_a: &GlobalTransform,
        transform_b: &GlobalTransform,
    ) {
        let threshold = self.breaking_threshold;
        self.points.retain_mut(|p| {
            p.position_world_on_a = transform_a.0.transform_point3(p.local_point_a);
            p.position_world_on_b = transform_b.0.transform_point3(p.local_point_b);
            p.distance = (p.position_world_on_a - p.position_world_on_b).dot(p.normal_world_on_b);
            p.lifetime += 1;

            if p.distance > threshold {
                return false;
            }
            let projected = p.position_world_on_a - p.normal_world_on_b * p.distance;
            (projected - p.position_world_on_b).length_squared() <= threshold * threshold
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies() -> (hecs::Entity, hecs::Entity) {
        let mut world = hecs::World::new();
        (
            world.spawn((GlobalTransform::default(),)),
            world.spawn((GlobalTransform::default(),)),
        )
    }

    fn penetrating_contact(point: Vec3, depth: f32) -> ContactInfo {
        // Body A above body B, normal A -> B points down
        ContactInfo {
            normal: -Vec3::Y,
            penetration: depth,
            point,
        }
    }

    #[test]
    fn test_from_contact_sign_convention() {
        let info = penetrating_contact(Vec3::ZERO, 0.1);
        let identity = GlobalTransform::default();
        let point = ManifoldPoint::from_contact(&info, &identity, &identity);

        assert_eq!(point.normal_world_on_b, Vec3::Y);
        assert!((point.distance + 0.1).abs() < 1e-6);
        assert!(point.is_penetrating());
        // Recomputed separation agrees with the stored one
        let d = (point.position_world_on_a - point.position_world_on_b).dot(point.normal_world_on_b);
        assert!((d - point.distance).abs() < 1e-6);
    }

    #[test]
    fn test_merge_nearby_points() {
        let (a, b) = bodies();
        let identity = GlobalTransform::default();
        let mut manifold = PersistentManifold::new(a, b, 4, 0.02, 0.02);

        manifold.add_contact_point(ManifoldPoint::from_contact(
            &penetrating_contact(Vec3::ZERO, 0.1),
            &identity,
            &identity,
        ));
        manifold.add_contact_point(ManifoldPoint::from_contact(
            &penetrating_contact(Vec3::new(0.005, 0.0, 0.0), 0.08),
            &identity,
            &identity,
        ));

        assert_eq!(manifold.num_contacts(), 1);
        let p = manifold.contact_point(0).unwrap();
        assert_eq!(p.lifetime, 1);
        assert!((p.distance + 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_capacity_keeps_deepest() {
        let (a, b) = bodies();
        let identity = GlobalTransform::default();
        let mut manifold = PersistentManifold::new(a, b, 4, 0.02, 0.02);

        for (i, depth) in [0.1, 0.2, 0.05, 0.3].into_iter().enumerate() {
            let info = penetrating_contact(Vec3::new(i as f32, 0.0, 0.0), depth);
            manifold.add_contact_point(ManifoldPoint::from_contact(&info, &identity, &identity));
        }
        assert_eq!(manifold.num_contacts(), 4);

        // Deeper than the shallowest (0.05): replaces it
        let info = penetrating_contact(Vec3::new(10.0, 0.0, 0.0), 0.15);
        manifold.add_contact_point(ManifoldPoint::from_contact(&info, &identity, &identity));
        assert_eq!(manifold.num_contacts(), 4);
        assert!(manifold.points().iter().all(|p| p.distance < -0.06));

        // Shallower than everything cached: ignored
        let info = penetrating_contact(Vec3::new(20.0, 0.0, 0.0), 0.01);
        manifold.add_contact_point(ManifoldPoint::from_contact(&info, &identity, &identity));
        assert!(manifold.points().iter().all(|p| p.distance < -0.06));
    }

    #[test]
    fn test_refresh_tracks_motion_and_breaks() {
        let (a, b) = bodies();
        let identity = GlobalTransform::default();
        let mut manifold = PersistentManifold::new(a, b, 4, 0.02, 0.02);
        manifold.add_contact_point(ManifoldPoint::from_contact(
            &penetrating_contact(Vec3::ZERO, 0.1),
            &identity,
            &identity,
        ));

        // Lift A by 0.08: still penetrating by 0.02
        let lifted = GlobalTransform::from_position(Vec3::new(0.0, 0.08, 0.0));
        manifold.refresh_contact_points(&lifted, &identity);
        assert_eq!(manifold.num_contacts(), 1);
        assert!((manifold.points()[0].distance + 0.02).abs() < 1e-5);

        // Lift A clear of B: point breaks
        let clear = GlobalTransform::from_position(Vec3::new(0.0, 0.5, 0.0));
        manifold.refresh_contact_points(&clear, &identity);
        assert_eq!(manifold.num_contacts(), 0);
    }

    #[test]
    fn test_with_points_uses_default_settings() {
        let (a, b) = bodies();
        let settings = ManifoldSettings::default();

        let manifold = PersistentManifold::with_points(a, b, vec![ManifoldPoint::new(Vec3::Y, -0.1)]);
        assert_eq!(manifold.num_contacts(), 1);
        assert_eq!(manifold.max_points, settings.max_points);
        assert_eq!(manifold.breaking_threshold, settings.breaking_threshold);
        assert_eq!(manifold.merge_threshold, settings.merge_threshold);

        // More points than the default cap are all kept
        let points = (0..6).map(|_| ManifoldPoint::new(Vec3::Y, -0.1)).collect();
        let manifold = PersistentManifold::with_points(a, b, points);
        assert_eq!(manifold.max_points, 6);
    }

    #[test]
    fn test_refresh_drops_sliding_points() {
        let (a, b) = bodies();
        let identity = GlobalTransform::default();
        let mut manifold = PersistentManifold::new(a, b, 4, 0.02, 0.02);
        manifold.add_contact_point(ManifoldPoint::from_contact(
            &penetrating_contact(Vec3::ZERO, 0.1),
            &identity,
            &identity,
        ));

        let slid = GlobalTransform::from_position(Vec3::new(0.5, 0.0, 0.0));
        manifold.refresh_contact_points(&slid, &identity);
        assert_eq!(manifold.num_contacts(), 0);
    }
}
