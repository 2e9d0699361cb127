use std::collections::HashMap;

use crate::physics::constraints::contact::ContactConstraint;

/// Accumulated impulses carried from one solve to the next.
///
/// Contacts are identified by the ordered body pair plus the contact's slot in the manifold; friction by the pair
/// alone. Collision detection must keep contact slots stable across steps for the cache to be useful.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarmStartCache {
    normal_impulses: HashMap<(u32, u32, u8), f32>,
    friction_impulses: HashMap<(u32, u32), [f32; 2]>,
}

impl WarmStartCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache contents with the final impulses of a solve.
    pub fn store(&mut self, constraints: &[ContactConstraint]) {
        self.clear();
        for constraint in constraints {
            let pair = (constraint.body_a, constraint.body_b);
            for point in 0..constraint.point_count.min(4) as usize {
                self.normal_impulses.insert(
                    (pair.0, pair.1, point as u8),
                    constraint.applied_impulse[point],
                );
            }
            self.friction_impulses
                .insert(pair, constraint.friction_impulse);
        }
    }

    /// Creates a cache holding the final impulses of a solve.
    pub fn from_constraints(constraints: &[ContactConstraint]) -> Self {
        let mut cache = Self::new();
        cache.store(constraints);
        cache
    }

    #[inline]
    pub fn normal_impulse(&self, body_a: u32, body_b: u32, point: usize) -> Option<f32> {
        self.normal_impulses
            .get(&(body_a, body_b, point as u8))
            .copied()
    }

    #[inline]
    pub fn friction_impulses(&self, body_a: u32, body_b: u32) -> Option<[f32; 2]> {
        self.friction_impulses.get(&(body_a, body_b)).copied()
    }

    /// Number of cached body pairs.
    pub fn pair_count(&self) -> usize {
        self.friction_impulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friction_impulses.is_empty()
    }

    pub fn clear(&mut self) {
        self.normal_impulses.clear();
        self.friction_impulses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_lookup() {
        let mut constraint = ContactConstraint {
            body_a: 3,
            body_b: 7,
            point_count: 2,
            ..Default::default()
        };
        constraint.applied_impulse = [1.5, 0.25, 0.0, 0.0];
        constraint.friction_impulse = [0.1, -0.2];
        let cache = WarmStartCache::from_constraints(&[constraint]);

        assert_eq!(cache.normal_impulse(3, 7, 0), Some(1.5));
        assert_eq!(cache.normal_impulse(3, 7, 1), Some(0.25));
        assert_eq!(cache.normal_impulse(3, 7, 2), None);
        assert_eq!(cache.normal_impulse(7, 3, 0), None);
        assert_eq!(cache.friction_impulses(3, 7), Some([0.1, -0.2]));
        assert_eq!(cache.pair_count(), 1);
    }

    #[test]
    fn test_store_replaces_previous_contents() {
        let first = ContactConstraint {
            body_a: 0,
            body_b: 1,
            point_count: 1,
            ..Default::default()
        };
        let second = ContactConstraint {
            body_a: 1,
            body_b: 2,
            point_count: 1,
            ..Default::default()
        };
        let mut cache = WarmStartCache::from_constraints(&[first]);
        cache.store(&[second]);
        assert_eq!(cache.friction_impulses(0, 1), None);
        assert!(cache.friction_impulses(1, 2).is_some());
    }
}
