//! Ghost objects: collision objects that only track their overlaps.

use tracing::trace;

use super::pair_cache::{BroadphasePair, OverlappingPairCache};

/// Component holding a ghost's private overlap set.
///
/// Pairs enter and leave through [`GhostPairCallback`]; the narrowphase fills
/// their manifolds only when the ghost's pairs are dispatched explicitly.
#[derive(Debug, Default, Clone)]
pub struct GhostObject {
    pair_cache: OverlappingPairCache,
}

impl GhostObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlapping_pairs(&self) -> &[BroadphasePair] {
        self.pair_cache.pairs()
    }

    pub fn num_overlapping_pairs(&self) -> usize {
        self.pair_cache.len()
    }

    pub fn pair_cache(&self) -> &OverlappingPairCache {
        &self.pair_cache
    }

    pub fn pair_cache_mut(&mut self) -> &mut OverlappingPairCache {
        &mut self.pair_cache
    }
}

/// Mirrors pairs of the main cache into the ghost objects they involve.
pub struct GhostPairCallback;

impl GhostPairCallback {
    pub fn pair_added(world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        for (ghost, other) in [(a, b), (b, a)] {
            if let Ok(mut object) = world.get::<&mut GhostObject>(ghost) {
                if object.pair_cache.add_overlapping_pair(ghost, other) {
                    trace!(?ghost, ?other, "ghost overlap added");
                }
            }
        }
    }

    pub fn pair_removed(world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        for (ghost, other) in [(a, b), (b, a)] {
            if let Ok(mut object) = world.get::<&mut GhostObject>(ghost) {
                if object.pair_cache.remove_overlapping_pair(ghost, other).is_some() {
                    trace!(?ghost, ?other, "ghost overlap removed");
                }
            }
        }
    }
}
