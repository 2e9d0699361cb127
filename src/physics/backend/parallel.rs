use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use crate::physics::backend::ExecutionBackend;
use crate::physics::body_properties::{BodyVelocity, SolverBody};
use crate::physics::conflict_batcher::ConstraintPartition;
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::constraints::{OverlayVelocities, UpdateMode};
use crate::physics::impulse_solver::ConstraintKernel;
use crate::utilities::{ScopedThreadDispatcher, ThreadDispatcher};

/// Backend that solves the cells of a cell-batch concurrently, one task per cell.
///
/// A cell-batch is executed in rounds: round `n` solves batch `n` of every cell that has one, then the sequential
/// fallback batches run in a final round. Tasks read a shared snapshot of the bodies and return their velocity
/// changes, which are committed once the round has joined. Regular batches use Jacobi updates; fallback batches use
/// Gauss-Seidel updates inside their task.
#[derive(Clone, Debug, Default)]
pub struct ParallelBackend<D: ThreadDispatcher = ScopedThreadDispatcher> {
    dispatcher: D,
}

impl ParallelBackend {
    /// Creates a backend running on scoped threads, one per available core.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: ThreadDispatcher> ParallelBackend<D> {
    pub fn with_dispatcher(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    #[inline(always)]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    fn dispatch_round(
        &self,
        kernel: &ConstraintKernel,
        ranges: &[Range<usize>],
        mode: UpdateMode,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    ) {
        let tasks = split_disjoint_mut(constraints, ranges);
        let snapshot: &[SolverBody] = bodies;
        let updates = self.dispatcher.dispatch_tasks(tasks, |_, group| {
            let mut overlay = OverlayVelocities::new(snapshot);
            for constraint in group.iter_mut() {
                kernel.solve(constraint, &mut overlay, mode);
            }
            overlay.into_updates()
        });
        commit_updates(bodies, updates);
    }
}

impl<D: ThreadDispatcher> ExecutionBackend for ParallelBackend<D> {
    fn execute_cell_batch(
        &self,
        kernel: &ConstraintKernel,
        cells: &[u32],
        partition: &ConstraintPartition,
        constraints: &mut [ContactConstraint],
        bodies: &mut [SolverBody],
    ) {
        let rounds = cells
            .iter()
            .map(|&cell| partition.batch_count(cell))
            .max()
            .unwrap_or(0);
        for round in 0..rounds {
            let ranges: Vec<_> = cells
                .iter()
                .filter(|&&cell| round < partition.batch_count(cell))
                .map(|&cell| partition.batch_range(cell, round))
                .collect();
            self.dispatch_round(kernel, &ranges, UpdateMode::Jacobi, constraints, bodies);
        }

        let fallback: Vec<_> = cells
            .iter()
            .map(|&cell| partition.fallback_range(cell))
            .filter(|range| !range.is_empty())
            .collect();
        if !fallback.is_empty() {
            self.dispatch_round(kernel, &fallback, UpdateMode::Sequential, constraints, bodies);
        }
    }
}

/// Splits a slice into mutable sub-slices for ascending, non-overlapping ranges.
fn split_disjoint_mut<'a, T>(mut slice: &'a mut [T], ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut consumed = 0;
    let mut parts = Vec::with_capacity(ranges.len());
    for range in ranges {
        debug_assert!(range.start >= consumed, "Ranges must be ascending and disjoint.");
        let (_, rest) = std::mem::take(&mut slice).split_at_mut(range.start - consumed);
        let (part, rest) = rest.split_at_mut(range.len());
        parts.push(part);
        slice = rest;
        consumed = range.end;
    }
    parts
}

/// Writes task results into the bodies.
///
/// A body written by a single task takes that task's velocity. A body written by several tasks (possible when a body
/// is referenced from two cells of the same cell-batch) receives the sum of every task's change.
fn commit_updates(bodies: &mut [SolverBody], updates: Vec<Vec<(u32, BodyVelocity)>>) {
    let mut base: HashMap<u32, BodyVelocity> = HashMap::new();
    for (index, velocity) in updates.into_iter().flatten() {
        let body = &mut bodies[index as usize];
        match base.entry(index) {
            Entry::Vacant(entry) => {
                entry.insert(body.velocity);
                body.velocity = velocity;
            }
            Entry::Occupied(entry) => {
                body.velocity += velocity - *entry.get();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::InlineDispatcher;
    use glam::Vec3;

    #[test]
    fn test_split_disjoint_mut() {
        let mut values: Vec<u32> = (0..10).collect();
        let parts = split_disjoint_mut(&mut values, &[1..3, 3..4, 7..10]);
        assert_eq!(parts.len(), 3);
        assert_eq!(&*parts[0], &[1, 2]);
        assert_eq!(&*parts[1], &[3]);
        assert_eq!(&*parts[2], &[7, 8, 9]);
        for part in parts {
            part[0] = 100;
        }
        assert_eq!(values[1], 100);
        assert_eq!(values[7], 100);
    }

    #[test]
    fn test_commit_sums_changes_of_shared_bodies() {
        let mut bodies = vec![
            SolverBody {
                dynamic: true,
                inverse_mass: 1.0,
                velocity: BodyVelocity::new(Vec3::X, Vec3::ZERO),
                ..Default::default()
            };
            2
        ];
        let updates = vec![
            vec![(0, BodyVelocity::new(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO))],
            vec![
                (0, BodyVelocity::new(Vec3::new(1.0, 3.0, 0.0), Vec3::ZERO)),
                (1, BodyVelocity::new(Vec3::ZERO, Vec3::Z)),
            ],
        ];
        commit_updates(&mut bodies, updates);
        assert_eq!(bodies[0].velocity.linear, Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(bodies[1].velocity, BodyVelocity::new(Vec3::ZERO, Vec3::Z));
    }

    #[test]
    fn test_inline_dispatcher_backend() {
        let backend = ParallelBackend::with_dispatcher(InlineDispatcher);
        assert_eq!(backend.dispatcher().thread_count(), 1);
    }
}
