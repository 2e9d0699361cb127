use crate::physics::backend::ExecutionBackend;
use crate::physics::body_properties::SolverBody;
use crate::physics::cell_grid::CellGrid;
use crate::physics::conflict_batcher::ConstraintPartition;
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::constraints::UpdateMode;
use crate::physics::impulse_solver::ConstraintKernel;

/// Order in which the host backend visits constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostTraversal {
    /// Walk cell-batches, cells and batches exactly like the parallel backend schedules them.
    #[default]
    Partitioned,
    /// Ignore the partition and walk the whole constraint array as one sequential group.
    Unpartitioned,
}

/// Single threaded backend used for verification and when no worker threads are available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostBackend {
    /// Update mode for regular batches. Sequential fallback batches always use [`UpdateMode::Sequential`].
    pub update_mode: UpdateMode,
    pub traversal: HostTraversal,
}

impl HostBackend {
    pub fn new(update_mode: UpdateMode, traversal: HostTraversal) -> Self {
        Self {
            update_mode,
            traversal,
        }
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    pub fn with_traversal(mut self, traversal: HostTraversal) -> Self {
        self.traversal = traversal;
        self
    }
}

impl ExecutionBackend for HostBackend {
    fn execute_cell_batch(
        &self,
        kernel: &ConstraintKernel,
        cells: &[u32],
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    ) {
        for &cell in cells {
            for batch in 0..partition.batch_count(cell) {
                for constraint in &mut constraints[partition.batch_range(cell, batch)] {
                    kernel.solve(constraint, bodies, self.update_mode);
                }
            }
            for constraint in &mut constraints[partition.fallback_range(cell)] {
                kernel.solve(constraint, bodies, UpdateMode::Sequential);
            }
        }
    }

    fn execute_phase(
        &self,
        kernel: &ConstraintKernel,
        grid: &CellGrid,
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    ) {
        match self.traversal {
            HostTraversal::Partitioned => {
                for cells in grid.cell_batches() {
                    self.execute_cell_batch(kernel, cells, partition, constraints, bodies);
                }
            }
            HostTraversal::Unpartitioned => {
                for constraint in constraints.iter_mut() {
                    kernel.solve(constraint, bodies, self.update_mode);
                }
            }
        }
    }
}
