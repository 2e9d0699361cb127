use crate::physics::backend::ExecutionBackend;
use crate::physics::body_properties::SolverBody;
use crate::physics::cell_grid::CellGrid;
use crate::physics::conflict_batcher::ConstraintPartition;
use crate::physics::constraints::contact::{ContactConstraint, FrictionDamping, PenetrationLimit, TangentFriction};
use crate::physics::constraints::{UpdateMode, VelocityStore};
use crate::physics::solve_description::SolveDescription;

/// Stage of the iteration a pass belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolvePhase {
    /// Applies the accumulated impulses carried over from the previous solve.
    WarmStart,
    /// Non-penetration updates.
    Contact,
    /// Friction updates. Runs only after every contact pass.
    Friction,
}

/// The per-constraint work of one pass. Every backend funnels its constraints through [`ConstraintKernel::solve`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintKernel {
    pub phase: SolvePhase,
    pub damping: FrictionDamping,
}

impl ConstraintKernel {
    #[inline(always)]
    pub fn solve<S: VelocityStore + ?Sized>(
        &self,
        constraint: &mut ContactConstraint,
        store: &mut S,
        mode: UpdateMode,
    ) {
        match self.phase {
            SolvePhase::WarmStart => {
                PenetrationLimit::warm_start(constraint, store);
                TangentFriction::warm_start(constraint, store);
            }
            SolvePhase::Contact => PenetrationLimit::solve(constraint, store, mode),
            SolvePhase::Friction => TangentFriction::solve(constraint, store, mode, &self.damping),
        }
    }
}

/// Drives the fixed iteration schedule: a warm start pass when impulses were seeded, `iteration_count` contact
/// passes, then `iteration_count` friction passes.
///
/// There is no convergence check; the cost of a solve is fixed by the configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterativeImpulseSolver {
    pub iteration_count: u32,
    pub damping: FrictionDamping,
}

impl IterativeImpulseSolver {
    pub fn new(description: &SolveDescription) -> Self {
        Self {
            iteration_count: description.iteration_count,
            damping: FrictionDamping {
                angular_damping: description.angular_damping,
                colinearity_threshold: description.colinearity_threshold,
            },
        }
    }

    #[inline(always)]
    pub fn kernel(&self, phase: SolvePhase) -> ConstraintKernel {
        ConstraintKernel {
            phase,
            damping: self.damping,
        }
    }

    /// Number of passes a solve executes.
    pub fn pass_count(&self, warm_started: bool) -> u32 {
        self.iteration_count * 2 + u32::from(warm_started)
    }

    /// Runs every pass over the partitioned constraints, updating body velocities in place.
    ///
    /// `warm_started` tells whether the accumulators were seeded from a cache; cold constraints skip the warm start
    /// pass.
    pub fn solve<B: ExecutionBackend + ?Sized>(
        &self,
        backend: &B,
        grid: &CellGrid,
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
        warm_started: bool,
    ) {
        if warm_started {
            backend.execute_phase(&self.kernel(SolvePhase::WarmStart), grid, partition, constraints, bodies);
        }
        let contact = self.kernel(SolvePhase::Contact);
        for _ in 0..self.iteration_count {
            backend.execute_phase(&contact, grid, partition, constraints, bodies);
        }
        let friction = self.kernel(SolvePhase::Friction);
        for _ in 0..self.iteration_count {
            backend.execute_phase(&friction, grid, partition, constraints, bodies);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records the phases it is asked to run without touching any state.
    #[derive(Default)]
    struct RecordingBackend {
        phases: RefCell<Vec<SolvePhase>>,
    }

    impl ExecutionBackend for RecordingBackend {
        fn execute_cell_batch(
            &self,
            _kernel: &ConstraintKernel,
            _cells: &[u32],
            _partition: &ConstraintPartition,
            _constraints: &mut [ContactConstraint],
            _bodies: &mut [SolverBody],
        ) {
        }

        fn execute_phase(
            &self,
            kernel: &ConstraintKernel,
            _grid: &CellGrid,
            _partition: &ConstraintPartition,
            _constraints: &mut [ContactConstraint],
            _bodies: &mut [SolverBody],
        ) {
            self.phases.borrow_mut().push(kernel.phase);
        }
    }

    #[test]
    fn test_phase_schedule() {
        let description = SolveDescription::default().with_iteration_count(2);
        let solver = IterativeImpulseSolver::new(&description);
        let batcher = crate::physics::conflict_batcher::ConflictBatcher::new(&description);
        let partition = batcher.batch(&[], &[]).unwrap();
        let backend = RecordingBackend::default();
        solver.solve(&backend, batcher.grid(), &partition, &mut [], &mut [], true);
        assert_eq!(
            *backend.phases.borrow(),
            vec![
                SolvePhase::WarmStart,
                SolvePhase::Contact,
                SolvePhase::Contact,
                SolvePhase::Friction,
                SolvePhase::Friction
            ]
        );
        assert_eq!(solver.pass_count(true), 5);
    }

    #[test]
    fn test_no_warm_start_pass_for_cold_constraints() {
        let description = SolveDescription::default().with_iteration_count(1);
        let solver = IterativeImpulseSolver::new(&description);
        let batcher = crate::physics::conflict_batcher::ConflictBatcher::new(&description);
        let partition = batcher.batch(&[], &[]).unwrap();
        let backend = RecordingBackend::default();
        solver.solve(&backend, batcher.grid(), &partition, &mut [], &mut [], false);
        assert_eq!(
            *backend.phases.borrow(),
            vec![SolvePhase::Contact, SolvePhase::Friction]
        );
        assert_eq!(solver.pass_count(false), 2);
    }
}
