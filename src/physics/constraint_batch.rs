use crate::utilities::IndexSet;

/// Set of constraints within one cell whose dynamic bodies are all distinct.
///
/// The batcher reuses one instance per batch slot across cells; [`ConstraintBatch::reset`] only clears the bits the
/// previous cell actually set.
#[derive(Clone, Debug, Default)]
pub struct ConstraintBatch {
    /// Dynamic bodies referenced by constraints in this batch.
    pub batch_referenced_bodies: IndexSet,
    referenced_list: Vec<usize>,
    constraints: Vec<u32>,
}

impl ConstraintBatch {
    pub fn new(body_capacity: usize) -> Self {
        Self {
            batch_referenced_bodies: IndexSet::with_capacity(body_capacity),
            referenced_list: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Gets whether a constraint referencing the given dynamic bodies could join this batch.
    #[inline(always)]
    pub fn can_fit(&self, dynamic_bodies: &[usize]) -> bool {
        self.batch_referenced_bodies.can_fit(dynamic_bodies)
    }

    /// Adds a constraint to the batch. The caller must have checked [`ConstraintBatch::can_fit`].
    pub fn allocate(&mut self, constraint_index: u32, dynamic_bodies: &[usize]) {
        debug_assert!(self.can_fit(dynamic_bodies));
        for &body in dynamic_bodies {
            self.batch_referenced_bodies.add(body);
            self.referenced_list.push(body);
        }
        self.constraints.push(constraint_index);
    }

    /// Constraint indices in the order they were added.
    #[inline(always)]
    pub fn constraints(&self) -> &[u32] {
        &self.constraints
    }

    #[inline(always)]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Empties the batch while keeping its allocations.
    pub fn reset(&mut self) {
        for &body in &self.referenced_list {
            self.batch_referenced_bodies.remove(body);
        }
        self.referenced_list.clear();
        self.constraints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_shared_body() {
        let mut batch = ConstraintBatch::new(16);
        batch.allocate(0, &[1, 2]);
        assert!(!batch.can_fit(&[2, 3]));
        assert!(batch.can_fit(&[3, 4]));
        assert!(batch.can_fit(&[]));
        batch.allocate(1, &[3, 4]);
        assert_eq!(batch.constraints(), &[0, 1]);
    }

    #[test]
    fn test_reset_clears_references() {
        let mut batch = ConstraintBatch::new(4);
        batch.allocate(7, &[100]);
        batch.reset();
        assert_eq!(batch.constraint_count(), 0);
        assert!(batch.can_fit(&[100]));
    }
}
