use crate::physics::body_properties::SolverBody;
use crate::physics::cell_grid::CellGrid;
use crate::physics::conflict_batcher::ConstraintPartition;
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::impulse_solver::ConstraintKernel;

mod host;
pub use self::host::*;

mod parallel;
pub use self::parallel::*;

/// Executes solver passes over partitioned constraints.
///
/// Implementations differ only in how they schedule the (cell, batch) groups; all of them run the same
/// [`ConstraintKernel`] per constraint. Given the same partition, every backend must produce the same velocities
/// within floating point tolerance.
pub trait ExecutionBackend {
    /// Runs the kernel over every constraint of the given cells, which all belong to one cell-batch.
    ///
    /// Every velocity change must be committed to `bodies` before this returns.
    fn execute_cell_batch(
        &self,
        kernel: &ConstraintKernel,
        cells: &[u32],
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    );

    /// Runs one full pass of the kernel: every cell-batch in order, each one finished before the next begins.
    fn execute_phase(
        &self,
        kernel: &ConstraintKernel,
        grid: &CellGrid,
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    ) {
        for cells in grid.cell_batches() {
            self.execute_cell_batch(kernel, cells, partition, constraints, bodies);
        }
    }
}
