/// Collection of unique indices supporting add, remove, and contains operations.
/// Uses packed bitfields where each bit represents one index's containment state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSet {
    /// Packed bitfields representing index containment.
    flags: Vec<u64>,
}

impl IndexSet {
    const SHIFT: usize = 6;
    const MASK: usize = 63;

    /// Gets the bundle capacity needed for the given count.
    #[inline(always)]
    pub fn get_bundle_capacity(count: usize) -> usize {
        (count + Self::MASK) >> Self::SHIFT
    }

    /// Creates a new set able to hold indices below `initial_capacity` without resizing.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            flags: vec![0; Self::get_bundle_capacity(initial_capacity)],
        }
    }

    /// Number of indices the set can hold without growing.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.flags.len() << Self::SHIFT
    }

    /// Checks if an index is contained in the set.
    #[inline(always)]
    pub fn contains(&self, index: usize) -> bool {
        let packed_index = index >> Self::SHIFT;
        packed_index < self.flags.len()
            && (self.flags[packed_index] & (1u64 << (index & Self::MASK))) > 0
    }

    /// Gets whether the set could hold the specified indices, i.e. none of them is present.
    #[inline(always)]
    pub fn can_fit(&self, index_list: &[usize]) -> bool {
        index_list.iter().all(|&index| !self.contains(index))
    }

    /// Sets an index in the set without checking whether it is already set.
    #[inline(always)]
    pub fn set(&mut self, index: usize) {
        let bundle_index = index >> Self::SHIFT;
        if bundle_index >= self.flags.len() {
            // Round up to power of 2
            let new_capacity = (bundle_index + 1).next_power_of_two();
            self.flags.resize(new_capacity, 0);
        }
        self.flags[bundle_index] |= 1u64 << (index & Self::MASK);
    }

    /// Adds an index to the set.
    #[inline(always)]
    pub fn add(&mut self, index: usize) {
        debug_assert!(!self.contains(index), "Cannot add if it's already present!");
        self.set(index);
    }

    /// Marks an index in the set as uncontained. Indices beyond the capacity are ignored.
    #[inline(always)]
    pub fn unset(&mut self, index: usize) {
        if let Some(bundle) = self.flags.get_mut(index >> Self::SHIFT) {
            *bundle &= !(1u64 << (index & Self::MASK));
        }
    }

    /// Removes an index from the set.
    #[inline(always)]
    pub fn remove(&mut self, index: usize) {
        debug_assert!(
            self.contains(index),
            "If you try to remove an index, it should be present."
        );
        self.unset(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains_remove() {
        let mut set = IndexSet::with_capacity(10);
        assert!(!set.contains(3));
        set.add(3);
        set.add(64);
        set.add(200);
        assert!(set.contains(3));
        assert!(set.contains(64));
        assert!(set.contains(200));
        assert!(!set.contains(4));

        set.remove(64);
        assert!(!set.contains(64));
        assert!(set.contains(3));
        assert!(set.contains(200));
    }

    #[test]
    fn test_can_fit() {
        let mut set = IndexSet::default();
        set.add(7);
        assert!(set.can_fit(&[1, 2, 3]));
        assert!(!set.can_fit(&[1, 7]));
        assert!(set.can_fit(&[]));
    }

    #[test]
    fn test_growth_rounds_to_power_of_two() {
        let mut set = IndexSet::default();
        set.set(5 * 64 + 1);
        assert_eq!(set.capacity(), 8 * 64);
        set.unset(100_000);
        assert!(set.contains(5 * 64 + 1));
    }
}
