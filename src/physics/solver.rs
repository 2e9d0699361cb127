use log::debug;

use crate::physics::backend::{ExecutionBackend, HostBackend};
use crate::physics::body_properties::{BodyInertia, RigidBody, SolverBody};
use crate::physics::collision_detection::ContactManifold;
use crate::physics::conflict_batcher::{ConflictBatcher, ConstraintPartition};
use crate::physics::constraint_converter::ConstraintConverter;
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::errors::{ScheduleStatus, SolverError};
use crate::physics::impulse_solver::IterativeImpulseSolver;
use crate::physics::solve_description::SolveDescription;
use crate::physics::warm_start::WarmStartCache;

/// Scheduling statistics of one solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub constraint_count: usize,
    /// Cells holding at least one constraint.
    pub occupied_cells: usize,
    /// Largest number of regular batches used by a single cell.
    pub max_batches_in_cell: usize,
    /// Constraints solved in sequential fallback batches.
    pub fallback_constraints: usize,
    /// Bodies referenced from more than one concurrently solved cell. Only measured in verification mode.
    pub cross_cell_shared_bodies: usize,
}

impl PartitionStats {
    fn new(partition: &ConstraintPartition, cross_cell_shared_bodies: usize) -> Self {
        Self {
            constraint_count: partition.constraint_count(),
            occupied_cells: partition.occupied_cells(),
            max_batches_in_cell: partition.max_batches_in_cell(),
            fallback_constraints: partition.fallback_constraint_count(),
            cross_cell_shared_bodies,
        }
    }
}

/// Result of a successful solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveReport {
    pub status: ScheduleStatus,
    pub stats: PartitionStats,
}

/// Contact solver: converts manifolds, partitions the constraints and iterates impulses on the chosen backend.
///
/// The solver keeps its working constraints between calls so the final accumulated impulses of the last solve can
/// seed a [`WarmStartCache`].
pub struct Solver<B: ExecutionBackend = HostBackend> {
    description: SolveDescription,
    converter: ConstraintConverter,
    batcher: ConflictBatcher,
    impulse_solver: IterativeImpulseSolver,
    backend: B,
    constraints: Vec<ContactConstraint>,
    partition: Option<ConstraintPartition>,
}

impl<B: ExecutionBackend> Solver<B> {
    /// Creates a solver after validating the description.
    pub fn new(description: SolveDescription, backend: B) -> Result<Self, SolverError> {
        description.validate()?;
        Ok(Self {
            converter: ConstraintConverter::new(&description),
            batcher: ConflictBatcher::new(&description),
            impulse_solver: IterativeImpulseSolver::new(&description),
            description,
            backend,
            constraints: Vec::new(),
            partition: None,
        })
    }

    #[inline(always)]
    pub fn description(&self) -> &SolveDescription {
        &self.description
    }

    #[inline(always)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline(always)]
    pub fn batcher(&self) -> &ConflictBatcher {
        &self.batcher
    }

    /// Constraints of the last solve in (cell, batch) order, holding their final accumulated impulses.
    #[inline(always)]
    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    /// Partition computed by the last solve.
    #[inline(always)]
    pub fn partition(&self) -> Option<&ConstraintPartition> {
        self.partition.as_ref()
    }

    /// Replaces the cache contents with the impulses of the last solve.
    pub fn store_warm_start(&self, cache: &mut WarmStartCache) {
        cache.store(&self.constraints);
    }

    /// Resolves the contacts and writes the new velocities of every dynamic body.
    ///
    /// Nothing is written when an error is returned. A cache is only consulted when warm starting is enabled.
    pub fn solve(
        &mut self,
        bodies: &mut [RigidBody],
        inertias: &[BodyInertia],
        manifolds: &[ContactManifold],
        warm_start: Option<&WarmStartCache>,
    ) -> Result<SolveReport, SolverError> {
        let mut states = SolverBody::gather(bodies, inertias, self.description.static_body_index)?;
        let warm_start = warm_start.filter(|_| self.description.warm_starting);
        let mut constraints = self.converter.convert_gathered(&states, manifolds, warm_start)?;

        let partition = self.batcher.batch(&constraints, &states)?;
        partition.apply(&mut constraints);

        let cross_cell_shared_bodies = if self.description.verify {
            partition.check_constraint_batches(&constraints, &states, self.batcher.grid())?
        } else {
            0
        };

        self.impulse_solver.solve(
            &self.backend,
            self.batcher.grid(),
            &partition,
            &mut constraints,
            &mut states,
            warm_start.is_some(),
        );

        if self.description.verify {
            if let Some(body) = states
                .iter()
                .position(|state| state.dynamic && !state.velocity.is_finite())
            {
                return Err(SolverError::NonFiniteVelocity { body: body as u32 });
            }
        }
        SolverBody::scatter(&states, bodies);

        let report = SolveReport {
            status: partition.status(),
            stats: PartitionStats::new(&partition, cross_cell_shared_bodies),
        };
        debug!(
            "solved {} constraints in {} cells, up to {} batches per cell, {} fallback, {} passes",
            report.stats.constraint_count,
            report.stats.occupied_cells,
            report.stats.max_batches_in_cell,
            report.stats.fallback_constraints,
            self.impulse_solver.pass_count(warm_start.is_some())
        );
        self.constraints = constraints;
        self.partition = Some(partition);
        Ok(report)
    }
}

impl Solver<HostBackend> {
    /// Creates a solver running on the calling thread.
    pub fn host(description: SolveDescription) -> Result<Self, SolverError> {
        Self::new(description, HostBackend::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::cell_grid::CellGrid;
    use crate::physics::impulse_solver::{ConstraintKernel, SolvePhase};
    use crate::physics::solve_description::OverflowPolicy;
    use glam::Vec3;

    fn resting_box() -> (Vec<RigidBody>, Vec<BodyInertia>, Vec<ContactManifold>) {
        let bodies = vec![
            RigidBody::new(Vec3::new(0.0, 0.5, 0.0), 1.0).with_linear_velocity(Vec3::new(0.5, -1.0, 0.0)),
            RigidBody::new_static(Vec3::ZERO),
        ];
        let inertias = vec![
            BodyInertia::solid_box(1.0, Vec3::splat(0.5)),
            BodyInertia::STATIC,
        ];
        let mut manifold = ContactManifold::new(0, 1, Vec3::Y).with_friction(0.5);
        for (x, z) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            manifold.add_point(Vec3::new(x, 0.0, z), 0.005);
        }
        (bodies, inertias, vec![manifold])
    }

    #[test]
    fn test_new_rejects_invalid_description() {
        let result = Solver::host(SolveDescription::new(-1.0));
        assert!(matches!(result, Err(SolverError::InvalidTimeStep(_))));
    }

    #[test]
    fn test_solve_stops_falling_box() {
        let (mut bodies, inertias, manifolds) = resting_box();
        let mut solver = Solver::host(SolveDescription::default().with_iteration_count(8)).unwrap();
        let report = solver.solve(&mut bodies, &inertias, &manifolds, None).unwrap();
        assert_eq!(report.status, ScheduleStatus::Succeeded);
        assert_eq!(report.stats.constraint_count, 1);
        assert!(bodies[0].linear_velocity.y > -1e-3);
        // Friction slows the slide without reversing it.
        assert!(bodies[0].linear_velocity.x < 0.5);
        assert!(bodies[0].linear_velocity.x > -1e-3);
        assert_eq!(bodies[1].linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_warm_start_round_trip() {
        let (bodies, inertias, manifolds) = resting_box();
        let mut solver = Solver::host(SolveDescription::default()).unwrap();
        let mut first = bodies.clone();
        solver.solve(&mut first, &inertias, &manifolds, None).unwrap();

        let mut cache = WarmStartCache::new();
        solver.store_warm_start(&mut cache);
        assert_eq!(cache.pair_count(), 1);
        assert!(cache.normal_impulse(0, 1, 0).unwrap() > 0.0);

        let mut second = bodies.clone();
        solver.solve(&mut second, &inertias, &manifolds, Some(&cache)).unwrap();
        assert!(second[0].linear_velocity.y > -1e-3);
    }

    /// Host backend that records the phase of every pass it runs.
    #[derive(Default)]
    struct PhaseLog {
        host: HostBackend,
        phases: std::cell::RefCell<Vec<SolvePhase>>,
    }

    impl ExecutionBackend for PhaseLog {
        fn execute_cell_batch(
            &self,
            kernel: &ConstraintKernel,
            cells: &[u32],
            partition: &ConstraintPartition,
            constraints: &mut [ContactConstraint],
            bodies: &mut [SolverBody],
        ) {
            self.host.execute_cell_batch(kernel, cells, partition, constraints, bodies);
        }

        fn execute_phase(
            &self,
            kernel: &ConstraintKernel,
            grid: &CellGrid,
            partition: &ConstraintPartition,
            constraints: &mut [ContactConstraint],
            bodies: &mut [SolverBody],
        ) {
            self.phases.borrow_mut().push(kernel.phase);
            self.host.execute_phase(kernel, grid, partition, constraints, bodies);
        }
    }

    #[test]
    fn test_warm_start_pass_runs_only_with_a_cache() {
        let (bodies, inertias, manifolds) = resting_box();
        let description = SolveDescription::default().with_iteration_count(1);
        let mut solver = Solver::new(description, PhaseLog::default()).unwrap();

        solver.solve(&mut bodies.clone(), &inertias, &manifolds, None).unwrap();
        assert_eq!(
            *solver.backend().phases.borrow(),
            vec![SolvePhase::Contact, SolvePhase::Friction]
        );

        let mut cache = WarmStartCache::new();
        solver.store_warm_start(&mut cache);
        solver.backend().phases.borrow_mut().clear();
        solver.solve(&mut bodies.clone(), &inertias, &manifolds, Some(&cache)).unwrap();
        assert_eq!(
            *solver.backend().phases.borrow(),
            vec![SolvePhase::WarmStart, SolvePhase::Contact, SolvePhase::Friction]
        );
    }

    #[test]
    fn test_failed_solve_leaves_bodies_untouched() {
        let (mut bodies, inertias, mut manifolds) = resting_box();
        manifolds.push(ContactManifold::new(0, 9, Vec3::Y));
        let before = bodies.clone();
        let mut solver = Solver::host(SolveDescription::default()).unwrap();
        assert!(solver.solve(&mut bodies, &inertias, &manifolds, None).is_err());
        assert_eq!(bodies, before);
    }

    #[test]
    fn test_verification_reports_non_finite_velocity() {
        let (mut bodies, inertias, manifolds) = resting_box();
        bodies[0].linear_velocity = Vec3::new(f32::NAN, 0.0, 0.0);
        let mut solver = Solver::host(SolveDescription::default().with_verification(true)).unwrap();
        assert_eq!(
            solver.solve(&mut bodies, &inertias, &manifolds, None),
            Err(SolverError::NonFiniteVelocity { body: 0 })
        );
    }

    #[test]
    fn test_overflow_policy_reaches_solver() {
        let mut bodies = vec![RigidBody::new(Vec3::ZERO, 1.0)];
        let mut inertias = vec![BodyInertia::solid_sphere(1.0, 0.5)];
        let mut manifolds = Vec::new();
        for i in 1..4u32 {
            bodies.push(RigidBody::new(Vec3::new(0.1 * i as f32, 0.0, 0.0), 1.0));
            inertias.push(BodyInertia::solid_sphere(1.0, 0.5));
            manifolds.push(ContactManifold::new(0, i, Vec3::X).with_point(Vec3::ZERO, 0.0));
        }
        let description = SolveDescription::default().with_max_batches_per_cell(1);

        let mut degraded = Solver::host(description).unwrap();
        let report = degraded.solve(&mut bodies.clone(), &inertias, &manifolds, None).unwrap();
        assert_eq!(report.status, ScheduleStatus::Degraded { fallback_constraints: 2 });

        let mut strict = Solver::host(description.with_overflow_policy(OverflowPolicy::Reject)).unwrap();
        assert!(matches!(
            strict.solve(&mut bodies, &inertias, &manifolds, None),
            Err(SolverError::PartitionOverflow { .. })
        ));
    }
}
