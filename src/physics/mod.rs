//! Collision detection with ghost objects and penetration recovery.
//!
//! # Architecture
//!
//! A detection pass runs in three stages:
//!
//! 1. Refresh the broadphase bounds of every non-static object
//! 2. Broadphase pair search (spatial hash grid), mirroring pair changes into ghosts
//! 3. Narrowphase over the main pair cache (GJK/EPA, SAT, specialized tests)
//!
//! Ghost objects keep their own overlap set. Their pairs are only given
//! contact manifolds when dispatched explicitly, which is what
//! [`CollisionWorld::recover_from_penetration`] does before computing the
//! push-out translation.

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod dispatcher;
pub mod error;
pub mod ghost;
pub mod narrowphase;
pub mod pair_cache;
pub mod recovery;

use glam::Vec3;
use tracing::debug;

use crate::ecs::components::physics::{Collider, CollisionObject};
use crate::ecs::components::transform::{GlobalTransform, Transform};

use self::broadphase::{PairChanges, SpatialHashGrid};
use self::collider::PhysicsAabb;
use self::contact::PersistentManifold;
use self::dispatcher::{Dispatcher, ManifoldSettings};
use self::error::{PhysicsError, PhysicsResult};
use self::ghost::{GhostObject, GhostPairCallback};
use self::pair_cache::{BroadphasePair, OverlappingPairCache};
use self::recovery::compute_correction;

/// Configuration for the collision world.
#[derive(Debug, Clone)]
pub struct CollisionConfig {
    /// Lower corner of the broadphase world. Default: (-1000, -1000, -1000).
    pub world_min: Vec3,
    /// Upper corner of the broadphase world. Default: (1000, 1000, 1000).
    pub world_max: Vec3,
    /// Separation past which cached contact points are dropped. Default: 0.02.
    pub contact_breaking_threshold: f32,
    /// Distance under which a new contact replaces a cached one. Default: 0.02.
    pub contact_merge_threshold: f32,
    /// Contact points kept per manifold. Default: 4.
    pub max_manifold_points: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            world_min: Vec3::splat(-1000.0),
            world_max: Vec3::splat(1000.0),
            contact_breaking_threshold: 0.02,
            contact_merge_threshold: 0.02,
            max_manifold_points: 4,
        }
    }
}

impl CollisionConfig {
    pub fn manifold_settings(&self) -> ManifoldSettings {
        ManifoldSettings {
            max_points: self.max_manifold_points,
            breaking_threshold: self.contact_breaking_threshold,
            merge_threshold: self.contact_merge_threshold,
        }
    }
}

/// Collision detection state for the entities of a [`hecs::World`].
pub struct CollisionWorld {
    config: CollisionConfig,
    broadphase: SpatialHashGrid,
    dispatcher: Dispatcher,
}

impl CollisionWorld {
    pub fn new(config: CollisionConfig) -> Self {
        let bounds = PhysicsAabb::new(config.world_min, config.world_max);
        Self {
            broadphase: SpatialHashGrid::new(bounds),
            dispatcher: Dispatcher::new(config.manifold_settings()),
            config,
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn broadphase(&self) -> &SpatialHashGrid {
        &self.broadphase
    }

    /// Register an entity carrying a [`Collider`] and a [`GlobalTransform`].
    ///
    /// The `object` filtering data is attached to the entity as a component.
    pub fn add_collision_object(
        &mut self,
        world: &mut hecs::World,
        entity: hecs::Entity,
        object: CollisionObject,
    ) -> PhysicsResult<()> {
        let aabb = shape_aabb(world, entity)?;
        self.broadphase.create_proxy(
            entity,
            aabb,
            object.filter_group,
            object.filter_mask,
            object.flags.is_static(),
        )?;
        world
            .insert_one(entity, object)
            .map_err(|_| PhysicsError::NotRegistered(entity))?;
        debug!(?entity, flags = object.flags.0, "collision object added");
        Ok(())
    }

    /// Register an entity as a character ghost tracking its own overlaps.
    pub fn add_ghost_object(
        &mut self,
        world: &mut hecs::World,
        entity: hecs::Entity,
    ) -> PhysicsResult<()> {
        self.add_collision_object(world, entity, CollisionObject::new_ghost())?;
        world
            .insert_one(entity, GhostObject::new())
            .map_err(|_| PhysicsError::NotRegistered(entity))
    }

    /// Unregister an entity, dropping every pair (and manifold) it was part of.
    pub fn remove_collision_object(
        &mut self,
        world: &mut hecs::World,
        entity: hecs::Entity,
    ) -> PhysicsResult<()> {
        let removed = self.broadphase.destroy_proxy(entity)?;
        for (a, b) in removed {
            GhostPairCallback::pair_removed(world, a, b);
        }
        // The entity may already be despawned
        let _ = world.remove_one::<GhostObject>(entity);
        let _ = world.remove_one::<CollisionObject>(entity);
        debug!(?entity, "collision object removed");
        Ok(())
    }

    /// Run broadphase and narrowphase over every registered object.
    ///
    /// Must run before a ghost's overlap set is queried for the current frame.
    pub fn perform_discrete_collision_detection(&mut self, world: &hecs::World) -> PhysicsResult<()> {
        for (entity, (collider, transform, object)) in world
            .query::<(&Collider, &GlobalTransform, &CollisionObject)>()
            .iter()
        {
            if object.flags.is_static() || self.broadphase.proxy(entity).is_none() {
                continue;
            }
            let aabb = collider
                .shape
                .compute_aabb(&transform.with_local_offset(collider.offset));
            self.broadphase.update_aabb(entity, aabb)?;
        }

        let changes = self.broadphase.calculate_overlapping_pairs();
        notify_ghosts(world, &changes);

        self.dispatcher
            .dispatch_all_collision_pairs(self.broadphase.pair_cache_mut().pairs_mut(), world);
        Ok(())
    }

    /// The ghost component of `ghost`, holding its overlap set.
    pub fn ghost_object<'w>(
        &self,
        world: &'w hecs::World,
        ghost: hecs::Entity,
    ) -> PhysicsResult<hecs::Ref<'w, GhostObject>> {
        world
            .get::<&GhostObject>(ghost)
            .map_err(|_| PhysicsError::NotAGhost(ghost))
    }

    pub fn num_overlapping_pairs(
        &self,
        world: &hecs::World,
        ghost: hecs::Entity,
    ) -> PhysicsResult<usize> {
        Ok(self.ghost_object(world, ghost)?.num_overlapping_pairs())
    }

    /// Push new bounds for one object into the broadphase right away.
    pub fn refresh_broadphase_bounds(
        &mut self,
        world: &hecs::World,
        entity: hecs::Entity,
        min: Vec3,
        max: Vec3,
    ) -> PhysicsResult<()> {
        let changes = self.broadphase.set_aabb(entity, PhysicsAabb::new(min, max))?;
        notify_ghosts(world, &changes);
        Ok(())
    }

    /// Run narrowphase over a ghost's own overlap set.
    pub fn dispatch_pairs(&self, world: &hecs::World, ghost: hecs::Entity) -> PhysicsResult<()> {
        let mut object = world
            .get::<&mut GhostObject>(ghost)
            .map_err(|_| PhysicsError::NotAGhost(ghost))?;
        self.dispatcher
            .dispatch_all_collision_pairs(object.pair_cache_mut().pairs_mut(), world);
        Ok(())
    }

    /// Move `ghost` out of everything it penetrates.
    ///
    /// Re-syncs its broadphase bounds, refreshes the manifolds of its overlap
    /// set, then translates its [`Transform`] and [`GlobalTransform`] by the
    /// computed correction. Returns the applied translation.
    pub fn recover_from_penetration(
        &mut self,
        world: &hecs::World,
        ghost: hecs::Entity,
    ) -> PhysicsResult<Vec3> {
        let aabb = shape_aabb(world, ghost)?;
        self.refresh_broadphase_bounds(world, ghost, aabb.min, aabb.max)?;
        self.dispatch_pairs(world, ghost)?;

        let correction = compute_correction(self.ghost_object(world, ghost)?.overlapping_pairs(), ghost);
        if correction != Vec3::ZERO {
            if let Ok(mut transform) = world.get::<&mut Transform>(ghost) {
                transform.translate(correction);
            }
            if let Ok(mut global) = world.get::<&mut GlobalTransform>(ghost) {
                global.translate(correction);
            }
            debug!(?ghost, %correction, "recovered from penetration");
        }
        Ok(correction)
    }

    /// Pairs found by the last detection pass.
    pub fn pair_cache(&self) -> &OverlappingPairCache {
        self.broadphase.pair_cache()
    }

    pub fn overlapping_pairs(&self) -> &[BroadphasePair] {
        self.broadphase.pair_cache().pairs()
    }

    /// Contact manifolds of every bound pair in the main cache.
    pub fn manifolds(&self) -> impl Iterator<Item = &PersistentManifold> {
        self.overlapping_pairs()
            .iter()
            .flat_map(BroadphasePair::manifolds)
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

fn notify_ghosts(world: &hecs::World, changes: &PairChanges) {
    for &(a, b) in &changes.removed {
        GhostPairCallback::pair_removed(world, a, b);
    }
    for &(a, b) in &changes.added {
        GhostPairCallback::pair_added(world, a, b);
    }
}

/// World-space bounds of an entity's collider.
fn shape_aabb(world: &hecs::World, entity: hecs::Entity) -> PhysicsResult<PhysicsAabb> {
    let collider = world
        .get::<&Collider>(entity)
        .map_err(|_| PhysicsError::MissingComponent(entity, "Collider"))?;
    let transform = world
        .get::<&GlobalTransform>(entity)
        .map_err(|_| PhysicsError::MissingComponent(entity, "GlobalTransform"))?;
    Ok(collider
        .shape
        .compute_aabb(&transform.with_local_offset(collider.offset)))
}
