//! Broadphase collision detection using spatial hash grid.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use tracing::{debug, warn};

use super::collider::PhysicsAabb;
use super::error::{PhysicsError, PhysicsResult};
use super::pair_cache::{pair_key, OverlappingPairCache};

type CellKey = (i32, i32, i32);
type PairKey = (hecs::Entity, hecs::Entity);

/// Broadphase entry for one registered entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadphaseProxy {
    pub aabb: PhysicsAabb,
    pub filter_group: u16,
    pub filter_mask: u16,
    pub is_static: bool,
}

impl BroadphaseProxy {
    /// Group/mask filtering plus the static-static exclusion.
    #[inline]
    pub fn accepts(&self, other: &BroadphaseProxy) -> bool {
        if self.is_static && other.is_static {
            return false;
        }
        (self.filter_group & other.filter_mask) != 0 && (other.filter_group & self.filter_mask) != 0
    }
}

/// Pairs that appeared or disappeared during an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairChanges {
    pub added: Vec<PairKey>,
    pub removed: Vec<PairKey>,
}

impl PairChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Spatial hash grid broadphase for O(n) average-case pair detection.
///
/// Proxies persist between updates and the overlapping pairs are cached, so
/// each update reports only the pairs that changed.
pub struct SpatialHashGrid {
    world_bounds: PhysicsAabb,
    cell_size: f32,
    cells: HashMap<CellKey, Vec<hecs::Entity>>,
    proxies: HashMap<hecs::Entity, BroadphaseProxy>,
    pair_cache: OverlappingPairCache,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(PhysicsAabb::new(Vec3::splat(-1000.0), Vec3::splat(1000.0)))
    }
}

impl SpatialHashGrid {
    pub fn new(world_bounds: PhysicsAabb) -> Self {
        Self {
            world_bounds,
            cell_size: 2.0,
            cells: HashMap::new(),
            proxies: HashMap::new(),
            pair_cache: OverlappingPairCache::new(),
        }
    }

    pub fn world_bounds(&self) -> PhysicsAabb {
        self.world_bounds
    }

    /// Compute cell coordinates for a point.
    #[inline]
    fn cell_coords(&self, point: Vec3) -> (i32, i32, i32) {
        let inv = 1.0 / self.cell_size;
        (
            (point.x * inv).floor() as i32,
            (point.y * inv).floor() as i32,
            (point.z * inv).floor() as i32,
        )
    }

    /// Register an entity. Its bounds must lie inside the world bounds.
    pub fn create_proxy(
        &mut self,
        entity: hecs::Entity,
        aabb: PhysicsAabb,
        filter_group: u16,
        filter_mask: u16,
        is_static: bool,
    ) -> PhysicsResult<()> {
        if self.proxies.contains_key(&entity) {
            return Err(PhysicsError::AlreadyRegistered(entity));
        }
        if !self.world_bounds.contains(&aabb) {
            return Err(PhysicsError::OutOfWorldBounds {
                entity,
                min: aabb.min,
                max: aabb.max,
            });
        }

        self.proxies.insert(
            entity,
            BroadphaseProxy {
                aabb,
                filter_group,
                filter_mask,
                is_static,
            },
        );
        debug!(?entity, min = %aabb.min, max = %aabb.max, "broadphase proxy created");
        Ok(())
    }

    /// Unregister an entity, returning the cached pairs it took with it.
    pub fn destroy_proxy(&mut self, entity: hecs::Entity) -> PhysicsResult<Vec<PairKey>> {
        self.proxies
            .remove(&entity)
            .ok_or(PhysicsError::NotRegistered(entity))?;
        Ok(self.pair_cache.remove_pairs_containing(entity))
    }

    pub fn proxy(&self, entity: hecs::Entity) -> Option<&BroadphaseProxy> {
        self.proxies.get(&entity)
    }

    pub fn num_proxies(&self) -> usize {
        self.proxies.len()
    }

    /// Store new bounds without touching the pair cache.
    ///
    /// Bounds leaving the world are clamped to it.
    pub fn update_aabb(&mut self, entity: hecs::Entity, aabb: PhysicsAabb) -> PhysicsResult<()> {
        let clamped = self.clamp_to_world(entity, aabb);
        let proxy = self
            .proxies
            .get_mut(&entity)
            .ok_or(PhysicsError::NotRegistered(entity))?;
        proxy.aabb = clamped;
        Ok(())
    }

    /// Store new bounds and immediately re-test this proxy against all others.
    pub fn set_aabb(&mut self, entity: hecs::Entity, aabb: PhysicsAabb) -> PhysicsResult<PairChanges> {
        self.update_aabb(entity, aabb)?;
        let proxy = self.proxies[&entity];

        let mut changes = PairChanges::default();
        for (&other, other_proxy) in &self.proxies {
            if other == entity {
                continue;
            }
            let key = pair_key(entity, other);
            let overlapping = proxy.accepts(other_proxy) && proxy.aabb.overlaps(&other_proxy.aabb);
            let cached = self.pair_cache.contains(key.0, key.1);
            if overlapping && !cached {
                changes.added.push(key);
            } else if !overlapping && cached {
                changes.removed.push(key);
            }
        }

        self.apply(&changes);
        Ok(changes)
    }

    /// Rebuild the grid from every proxy and sync the pair cache with it.
    pub fn calculate_overlapping_pairs(&mut self) -> PairChanges {
        self.cells.clear();

        let max_extent = self
            .proxies
            .values()
            .map(|p| p.aabb.extent().max_element())
            .fold(0.0_f32, f32::max);

        // Set cell size to 2x the max AABB extent (minimum 1.0)
        self.cell_size = (max_extent * 2.0).max(1.0);

        for (&entity, proxy) in &self.proxies {
            let min_cell = self.cell_coords(proxy.aabb.min);
            let max_cell = self.cell_coords(proxy.aabb.max);

            for cx in min_cell.0..=max_cell.0 {
                for cy in min_cell.1..=max_cell.1 {
                    for cz in min_cell.2..=max_cell.2 {
                        self.cells.entry((cx, cy, cz)).or_default().push(entity);
                    }
                }
            }
        }

        let mut current: HashSet<PairKey> = HashSet::new();
        for cell in self.cells.values() {
            for i in 0..cell.len() {
                for j in (i + 1)..cell.len() {
                    let pair = pair_key(cell[i], cell[j]);
                    if current.contains(&pair) {
                        continue;
                    }
                    let a = &self.proxies[&pair.0];
                    let b = &self.proxies[&pair.1];
                    if a.accepts(b) && a.aabb.overlaps(&b.aabb) {
                        current.insert(pair);
                    }
                }
            }
        }

        let mut changes = PairChanges {
            added: current
                .iter()
                .filter(|key| !self.pair_cache.contains(key.0, key.1))
                .copied()
                .collect(),
            removed: self
                .pair_cache
                .pairs()
                .iter()
                .map(|pair| pair.key())
                .filter(|key| !current.contains(key))
                .collect(),
        };
        changes.added.sort_unstable();
        changes.removed.sort_unstable();

        self.apply(&changes);
        changes
    }

    pub fn pair_cache(&self) -> &OverlappingPairCache {
        &self.pair_cache
    }

    pub fn pair_cache_mut(&mut self) -> &mut OverlappingPairCache {
        &mut self.pair_cache
    }

    fn apply(&mut self, changes: &PairChanges) {
        for &(a, b) in &changes.removed {
            self.pair_cache.remove_overlapping_pair(a, b);
        }
        for &(a, b) in &changes.added {
            self.pair_cache.add_overlapping_pair(a, b);
        }
        if !changes.is_empty() {
            debug!(
                added = changes.added.len(),
                removed = changes.removed.len(),
                total = self.pair_cache.len(),
                "broadphase pairs updated"
            );
        }
    }

    fn clamp_to_world(&self, entity: hecs::Entity, aabb: PhysicsAabb) -> PhysicsAabb {
        if self.world_bounds.contains(&aabb) {
            return aabb;
        }
        warn!(?entity, min = %aabb.min, max = %aabb.max, "proxy left the broadphase world, clamping");
        let (lo, hi) = (self.world_bounds.min, self.world_bounds.max);
        PhysicsAabb::new(aabb.min.clamp(lo, hi), aabb.max.clamp(lo, hi))
    }
}
