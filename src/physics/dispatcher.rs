//! Narrowphase dispatch: binds collision algorithms to broadphase pairs and
//! keeps their persistent manifolds up to date.

use tracing::trace;

use crate::ecs::components::physics::{Collider, ColliderShape, CollisionObject};
use crate::ecs::components::transform::GlobalTransform;

use super::contact::{ContactInfo, ManifoldPoint, PersistentManifold};
use super::narrowphase::{box_sphere, convex_convex, sat_box_box, sphere_sphere};
use super::pair_cache::BroadphasePair;

/// Which narrowphase routine a pair uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    SphereSphere,
    BoxBox,
    BoxSphere,
    SphereBox,
    ConvexConvex,
}

impl AlgorithmKind {
    /// Pick the cheapest routine for a shape combination.
    pub fn for_shapes(a: &ColliderShape, b: &ColliderShape) -> Self {
        match (a, b) {
            (ColliderShape::Sphere { .. }, ColliderShape::Sphere { .. }) => Self::SphereSphere,
            (ColliderShape::Box { .. }, ColliderShape::Box { .. }) => Self::BoxBox,
            (ColliderShape::Box { .. }, ColliderShape::Sphere { .. }) => Self::BoxSphere,
            (ColliderShape::Sphere { .. }, ColliderShape::Box { .. }) => Self::SphereBox,
            _ => Self::ConvexConvex,
        }
    }

    /// Run the routine. The result's normal points from A to B.
    pub fn detect(
        self,
        shape_a: &ColliderShape,
        transform_a: &GlobalTransform,
        shape_b: &ColliderShape,
        transform_b: &GlobalTransform,
    ) -> Option<ContactInfo> {
        match (self, shape_a, shape_b) {
            (
                Self::SphereSphere,
                ColliderShape::Sphere { radius: ra },
                ColliderShape::Sphere { radius: rb },
            ) => sphere_sphere(*ra, transform_a, *rb, transform_b),
            (
                Self::BoxBox,
                ColliderShape::Box { half_extents: ha },
                ColliderShape::Box { half_extents: hb },
            ) => sat_box_box(*ha, transform_a.0, *hb, transform_b.0),
            (
                Self::BoxSphere,
                ColliderShape::Box { half_extents },
                ColliderShape::Sphere { radius },
            ) => box_sphere(*half_extents, transform_a, *radius, transform_b),
            (
                Self::SphereBox,
                ColliderShape::Sphere { radius },
                ColliderShape::Box { half_extents },
            ) => box_sphere(*half_extents, transform_b, *radius, transform_a).map(|info| {
                ContactInfo {
                    normal: -info.normal,
                    ..info
                }
            }),
            // Shapes changed since binding, or a generic pair
            _ => convex_convex(shape_a, transform_a, shape_b, transform_b),
        }
    }
}

/// Manifold tuning shared by every algorithm the dispatcher creates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldSettings {
    pub max_points: usize,
    pub breaking_threshold: f32,
    pub merge_threshold: f32,
}

impl Default for ManifoldSettings {
    fn default() -> Self {
        Self {
            max_points: 4,
            breaking_threshold: 0.02,
            merge_threshold: 0.02,
        }
    }
}

/// Narrowphase algorithm bound to a pair, owning the pair's manifold.
#[derive(Debug, Clone)]
pub struct CollisionAlgorithm {
    kind: AlgorithmKind,
    manifold: PersistentManifold,
}

impl CollisionAlgorithm {
    pub fn new(
        kind: AlgorithmKind,
        body_a: hecs::Entity,
        body_b: hecs::Entity,
        settings: &ManifoldSettings,
    ) -> Self {
        Self {
            kind,
            manifold: PersistentManifold::new(
                body_a,
                body_b,
                settings.max_points,
                settings.breaking_threshold,
                settings.merge_threshold,
            ),
        }
    }

    /// Algorithm wrapping an already populated manifold.
    pub fn with_manifold(kind: AlgorithmKind, manifold: PersistentManifold) -> Self {
        Self { kind, manifold }
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn all_contact_manifolds(&self) -> &[PersistentManifold] {
        std::slice::from_ref(&self.manifold)
    }

    /// Refresh cached points, then add the current deepest contact if any.
    pub fn process_collision(
        &mut self,
        shape_a: &ColliderShape,
        transform_a: &GlobalTransform,
        shape_b: &ColliderShape,
        transform_b: &GlobalTransform,
    ) {
        self.manifold.refresh_contact_points(transform_a, transform_b);

        if let Some(info) = self.kind.detect(shape_a, transform_a, shape_b, transform_b) {
            self.manifold
                .add_contact_point(ManifoldPoint::from_contact(&info, transform_a, transform_b));
        }
    }
}

/// Collider, placement and filtering of one side of a pair.
struct PairSide {
    collider: Collider,
    transform: GlobalTransform,
    object: CollisionObject,
}

impl PairSide {
    fn fetch(world: &hecs::World, entity: hecs::Entity) -> Option<Self> {
        let collider = world.get::<&Collider>(entity).ok()?;
        let transform = world.get::<&GlobalTransform>(entity).ok()?;
        let object = world
            .get::<&CollisionObject>(entity)
            .map(|o| *o)
            .unwrap_or_default();
        Some(Self {
            transform: transform.with_local_offset(collider.offset),
            collider: (*collider).clone(),
            object,
        })
    }
}

/// Creates algorithms for new pairs and runs narrowphase on bound ones.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    settings: ManifoldSettings,
}

impl Dispatcher {
    pub fn new(settings: ManifoldSettings) -> Self {
        Self { settings }
    }

    /// Whether narrowphase should run for two objects at all.
    pub fn needs_collision(a: &CollisionObject, b: &CollisionObject) -> bool {
        if a.flags.is_static() && b.flags.is_static() {
            return false;
        }
        a.should_collide(b)
    }

    pub fn find_algorithm(
        &self,
        body_a: hecs::Entity,
        shape_a: &ColliderShape,
        body_b: hecs::Entity,
        shape_b: &ColliderShape,
    ) -> CollisionAlgorithm {
        let kind = AlgorithmKind::for_shapes(shape_a, shape_b);
        trace!(?body_a, ?body_b, ?kind, "binding collision algorithm");
        CollisionAlgorithm::new(kind, body_a, body_b, &self.settings)
    }

    /// Run narrowphase over every pair, binding algorithms on first contact.
    ///
    /// Pairs whose entities lost their collider or transform are unbound.
    pub fn dispatch_all_collision_pairs(&self, pairs: &mut [BroadphasePair], world: &hecs::World) {
        for pair in pairs.iter_mut() {
            let (Some(a), Some(b)) = (
                PairSide::fetch(world, pair.proxy0),
                PairSide::fetch(world, pair.proxy1),
            ) else {
                pair.algorithm = None;
                continue;
            };

            if !Self::needs_collision(&a.object, &b.object) {
                continue;
            }

            let (body_a, body_b) = pair.key();
            let algorithm = pair.algorithm.get_or_insert_with(|| {
                self.find_algorithm(body_a, &a.collider.shape, body_b, &b.collider.shape)
            });
            algorithm.process_collision(
                &a.collider.shape,
                &a.transform,
                &b.collider.shape,
                &b.transform,
            );
        }
    }
}
