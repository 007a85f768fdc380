//! Penetration recovery for ghost objects.
//!
//! Given the contact manifolds in a ghost's overlap set, computes one
//! translation that pushes the tracked body out of whatever it is sunk into.
//! Each axis of the result is taken independently from the candidate with the
//! largest magnitude on that axis, so the result is not the deepest single
//! contact vector but a per-axis composite of them.

use glam::Vec3;

use super::contact::PersistentManifold;
use super::pair_cache::BroadphasePair;

/// Correction for `tracked` over every bound pair of an overlap set.
///
/// Unbound pairs are skipped. Returns zero when nothing penetrates.
pub fn compute_correction(overlap_set: &[BroadphasePair], tracked: hecs::Entity) -> Vec3 {
    correction_from_manifolds(
        overlap_set.iter().flat_map(BroadphasePair::manifolds),
        tracked,
    )
}

/// Same as [`compute_correction`] over bare manifolds.
pub fn correction_from_manifolds<'a>(
    manifolds: impl IntoIterator<Item = &'a PersistentManifold>,
    tracked: hecs::Entity,
) -> Vec3 {
    let mut correction = Vec3::ZERO;

    for manifold in manifolds {
        // The stored normal points from B to A
        let direction_sign = if manifold.body_a == tracked { -1.0 } else { 1.0 };

        for point in manifold.points().iter().filter(|p| p.is_penetrating()) {
            let recovery = point.normal_world_on_b * (direction_sign * point.distance);
            correction = Vec3::select(recovery.abs().cmpgt(correction.abs()), recovery, correction);
        }
    }

    correction
}
