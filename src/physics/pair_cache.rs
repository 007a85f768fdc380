//! Overlapping pair cache shared by the broadphase and ghost objects.

use std::collections::HashMap;

use super::contact::PersistentManifold;
use super::dispatcher::CollisionAlgorithm;

/// Candidate pair proposed by the broadphase.
///
/// `algorithm` stays `None` until the dispatcher promotes the pair to a
/// narrowphase contact.
#[derive(Debug, Clone)]
pub struct BroadphasePair {
    pub proxy0: hecs::Entity,
    pub proxy1: hecs::Entity,
    pub algorithm: Option<CollisionAlgorithm>,
}

impl BroadphasePair {
    /// New unbound pair with canonical ordering (smaller entity first).
    pub fn new(a: hecs::Entity, b: hecs::Entity) -> Self {
        let (proxy0, proxy1) = pair_key(a, b);
        Self {
            proxy0,
            proxy1,
            algorithm: None,
        }
    }

    #[inline]
    pub fn key(&self) -> (hecs::Entity, hecs::Entity) {
        (self.proxy0, self.proxy1)
    }

    #[inline]
    pub fn involves(&self, entity: hecs::Entity) -> bool {
        self.proxy0 == entity || self.proxy1 == entity
    }

    /// The other member of the pair, if `entity` is one of them.
    pub fn other(&self, entity: hecs::Entity) -> Option<hecs::Entity> {
        if self.proxy0 == entity {
            Some(self.proxy1)
        } else if self.proxy1 == entity {
            Some(self.proxy0)
        } else {
            None
        }
    }

    pub fn is_bound(&self) -> bool {
        self.algorithm.is_some()
    }

    /// Manifolds of the bound algorithm; empty for unbound pairs.
    pub fn manifolds(&self) -> &[PersistentManifold] {
        self.algorithm
            .as_ref()
            .map_or(&[], |algorithm| algorithm.all_contact_manifolds())
    }
}

/// Canonical pair key (smaller entity first).
#[inline]
pub fn pair_key(a: hecs::Entity, b: hecs::Entity) -> (hecs::Entity, hecs::Entity) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Insertion-ordered set of broadphase pairs with O(1) lookup.
#[derive(Debug, Default, Clone)]
pub struct OverlappingPairCache {
    pairs: Vec<BroadphasePair>,
    index: HashMap<(hecs::Entity, hecs::Entity), usize>,
}

impl OverlappingPairCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair. Returns false if it was already cached.
    pub fn add_overlapping_pair(&mut self, a: hecs::Entity, b: hecs::Entity) -> bool {
        let key = pair_key(a, b);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.pairs.len());
        self.pairs.push(BroadphasePair::new(a, b));
        true
    }

    /// Remove a pair, dropping its algorithm and manifolds.
    pub fn remove_overlapping_pair(
        &mut self,
        a: hecs::Entity,
        b: hecs::Entity,
    ) -> Option<BroadphasePair> {
        let slot = self.index.remove(&pair_key(a, b))?;
        let removed = self.pairs.swap_remove(slot);
        if let Some(moved) = self.pairs.get(slot) {
            self.index.insert(moved.key(), slot);
        }
        Some(removed)
    }

    /// Remove every pair involving `entity`, returning their keys.
    pub fn remove_pairs_containing(
        &mut self,
        entity: hecs::Entity,
    ) -> Vec<(hecs::Entity, hecs::Entity)> {
        let keys: Vec<_> = self
            .pairs
            .iter()
            .filter(|pair| pair.involves(entity))
            .map(BroadphasePair::key)
            .collect();
        for &(a, b) in &keys {
            self.remove_overlapping_pair(a, b);
        }
        keys
    }

    pub fn find_pair(&self, a: hecs::Entity, b: hecs::Entity) -> Option<&BroadphasePair> {
        self.index.get(&pair_key(a, b)).map(|&slot| &self.pairs[slot])
    }

    pub fn contains(&self, a: hecs::Entity, b: hecs::Entity) -> bool {
        self.index.contains_key(&pair_key(a, b))
    }

    pub fn pairs(&self) -> &[BroadphasePair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [BroadphasePair] {
        &mut self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize) -> Vec<hecs::Entity> {
        let mut world = hecs::World::new();
        (0..n).map(|i| world.spawn((i,))).collect()
    }

    #[test]
    fn test_pair_is_canonical() {
        let e = entities(2);
        let forward = BroadphasePair::new(e[0], e[1]);
        let backward = BroadphasePair::new(e[1], e[0]);
        assert_eq!(forward.key(), backward.key());
        assert_eq!(forward.other(e[0]), Some(e[1]));
        assert!(!forward.is_bound());
        assert!(forward.manifolds().is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let e = entities(2);
        let mut cache = OverlappingPairCache::new();
        assert!(cache.add_overlapping_pair(e[0], e[1]));
        assert!(!cache.add_overlapping_pair(e[1], e[0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let e = entities(4);
        let mut cache = OverlappingPairCache::new();
        cache.add_overlapping_pair(e[0], e[1]);
        cache.add_overlapping_pair(e[0], e[2]);
        cache.add_overlapping_pair(e[2], e[3]);

        assert!(cache.remove_overlapping_pair(e[1], e[0]).is_some());
        assert!(cache.remove_overlapping_pair(e[1], e[0]).is_none());

        // The pair moved into the freed slot is still reachable
        assert!(cache.find_pair(e[3], e[2]).is_some());
        assert!(cache.contains(e[0], e[2]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_remove_pairs_containing() {
        let e = entities(4);
        let mut cache = OverlappingPairCache::new();
        cache.add_overlapping_pair(e[0], e[1]);
        cache.add_overlapping_pair(e[2], e[0]);
        cache.add_overlapping_pair(e[2], e[3]);

        let removed = cache.remove_pairs_containing(e[0]);
        assert_eq!(removed.len(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(e[2], e[3]));
    }
}
