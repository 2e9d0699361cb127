use std::collections::HashSet;

/// Contains constraints that could not belong to any regular batch of their cell due to their involved bodies.
///
/// The contained constraints are solved one after another by the worker owning their cell, after the cell's regular
/// batches. That trades parallelism within the cell for completeness of the schedule.
#[derive(Clone, Debug, Default)]
pub struct SequentialFallbackBatch {
    constraints_per_cell: Vec<Vec<u32>>,
    /// Dynamic bodies referenced by any fallback constraint.
    dynamic_bodies: HashSet<usize>,
}

impl SequentialFallbackBatch {
    pub fn new(cell_count: usize) -> Self {
        Self {
            constraints_per_cell: vec![Vec::new(); cell_count],
            dynamic_bodies: HashSet::new(),
        }
    }

    /// Adds a constraint of the given cell to the fallback batch.
    pub fn allocate(&mut self, cell: u32, constraint_index: u32, dynamic_bodies: &[usize]) {
        self.constraints_per_cell[cell as usize].push(constraint_index);
        self.dynamic_bodies.extend(dynamic_bodies);
    }

    /// Fallback constraints of a cell in the order they were added.
    #[inline(always)]
    pub fn constraints_in_cell(&self, cell: u32) -> &[u32] {
        &self.constraints_per_cell[cell as usize]
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints_per_cell.iter().map(Vec::len).sum()
    }

    /// Gets the number of dynamic bodies in the fallback batch.
    pub fn body_count(&self) -> usize {
        self.dynamic_bodies.len()
    }

    /// Cells which own at least one fallback constraint.
    pub fn overflowing_cells(&self) -> impl Iterator<Item = u32> + '_ {
        self.constraints_per_cell
            .iter()
            .enumerate()
            .filter(|(_, constraints)| !constraints.is_empty())
            .map(|(cell, _)| cell as u32)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.constraints_per_cell.iter().all(Vec::is_empty)
    }
}
