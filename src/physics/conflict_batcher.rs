use std::collections::{HashMap, HashSet};
use std::ops::Range;

use glam::Vec3;
use log::warn;

use crate::physics::body_properties::SolverBody;
use crate::physics::cell_grid::CellGrid;
use crate::physics::constraint_batch::ConstraintBatch;
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::errors::{ScheduleStatus, SolverError};
use crate::physics::sequential_fallback_batch::SequentialFallbackBatch;
use crate::physics::solve_description::{CellAnchor, OverflowPolicy, SolveDescription};

/// Assigns every constraint a spatial cell and a batch within that cell.
///
/// Within one (cell, batch) pair no dynamic body is referenced twice. Static bodies are exempt since nothing writes
/// them.
#[derive(Clone, Debug)]
pub struct ConflictBatcher {
    grid: CellGrid,
    max_batches_per_cell: u32,
    cell_anchor: CellAnchor,
    overflow_policy: OverflowPolicy,
}

impl ConflictBatcher {
    pub fn new(description: &SolveDescription) -> Self {
        Self {
            grid: CellGrid::new(
                description.grid_split,
                description.average_object_extent,
                description.objects_per_cell,
            ),
            max_batches_per_cell: description.max_batches_per_cell,
            cell_anchor: description.cell_anchor,
            overflow_policy: description.overflow_policy,
        }
    }

    #[inline(always)]
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    #[inline(always)]
    pub fn max_batches_per_cell(&self) -> u32 {
        self.max_batches_per_cell
    }

    /// Gets the position used to place a constraint into a cell.
    pub fn anchor_of(&self, constraint: &ContactConstraint, bodies: &[SolverBody]) -> Vec3 {
        let body_a = &bodies[constraint.body_a as usize];
        match self.cell_anchor {
            CellAnchor::DynamicBody if body_a.dynamic => body_a.position,
            CellAnchor::DynamicBody => bodies[constraint.body_b as usize].position,
            CellAnchor::ContactCenter if constraint.point_count > 0 => constraint.center,
            CellAnchor::ContactCenter => body_a.position,
        }
    }

    /// Partitions the constraints. Constraints are visited in index order, so the result depends on that order but is
    /// always conflict-free.
    pub fn batch(
        &self,
        constraints: &[ContactConstraint],
        bodies: &[SolverBody],
    ) -> Result<ConstraintPartition, SolverError> {
        let cell_count = self.grid.cell_count();
        let cell_of: Vec<u32> = constraints
            .iter()
            .map(|constraint| self.grid.cell_of(self.anchor_of(constraint, bodies)))
            .collect();

        let mut members: Vec<Vec<u32>> = vec![Vec::new(); cell_count];
        for (constraint_index, &cell) in cell_of.iter().enumerate() {
            members[cell as usize].push(constraint_index as u32);
        }

        let mut batch_of = vec![0u32; constraints.len()];
        let mut order = Vec::with_capacity(constraints.len());
        let mut counts_per_cell = vec![0u32; cell_count];
        let mut offsets_per_cell = vec![0u32; cell_count];
        let mut batch_starts = Vec::with_capacity(cell_count);
        let mut fallback = SequentialFallbackBatch::new(cell_count);
        let mut batches: Vec<ConstraintBatch> = Vec::new();

        for (cell, cell_members) in members.iter().enumerate() {
            let cell = cell as u32;
            let mut batch_count = 0usize;
            for &constraint_index in cell_members {
                let constraint = &constraints[constraint_index as usize];
                let mut dynamic_bodies = [0usize; 2];
                let mut dynamic_count = 0;
                for body in constraint.dynamic_bodies(bodies) {
                    dynamic_bodies[dynamic_count] = body as usize;
                    dynamic_count += 1;
                }
                let dynamic_bodies = &dynamic_bodies[..dynamic_count];

                match Self::find_candidate_batch(&batches[..batch_count], dynamic_bodies) {
                    Some(target) => batches[target].allocate(constraint_index, dynamic_bodies),
                    None if batch_count < self.max_batches_per_cell as usize => {
                        if batch_count == batches.len() {
                            batches.push(ConstraintBatch::new(bodies.len()));
                        }
                        batches[batch_count].allocate(constraint_index, dynamic_bodies);
                        batch_count += 1;
                    }
                    None => match self.overflow_policy {
                        OverflowPolicy::Reject => {
                            return Err(SolverError::PartitionOverflow {
                                cell,
                                manifold: constraint.manifold_index as usize,
                                max_batches: self.max_batches_per_cell,
                            });
                        }
                        OverflowPolicy::SequentialFallback => {
                            fallback.allocate(cell, constraint_index, dynamic_bodies);
                        }
                    },
                }
            }

            offsets_per_cell[cell as usize] = order.len() as u32;
            let mut starts = Vec::with_capacity(batch_count + 1);
            for (batch_index, batch) in batches[..batch_count].iter_mut().enumerate() {
                starts.push(order.len() as u32);
                for &constraint_index in batch.constraints() {
                    batch_of[constraint_index as usize] = batch_index as u32;
                    order.push(constraint_index);
                }
                batch.reset();
            }
            starts.push(order.len() as u32);
            for &constraint_index in fallback.constraints_in_cell(cell) {
                batch_of[constraint_index as usize] = self.max_batches_per_cell;
                order.push(constraint_index);
            }
            counts_per_cell[cell as usize] = order.len() as u32 - offsets_per_cell[cell as usize];
            batch_starts.push(starts);
        }

        let fallback_count = fallback.constraint_count();
        if fallback_count > 0 {
            warn!(
                "{} constraints in {} cells overflowed the {} batches of their cell and will be solved sequentially ({} bodies involved)",
                fallback_count,
                fallback.overflowing_cells().count(),
                self.max_batches_per_cell,
                fallback.body_count()
            );
        }

        Ok(ConstraintPartition {
            cell_of,
            batch_of,
            order,
            counts_per_cell,
            offsets_per_cell,
            batch_starts,
            fallback,
            max_batches_per_cell: self.max_batches_per_cell,
        })
    }

    /// Finds the lowest batch which none of the constraint's dynamic bodies already belongs to.
    #[inline(always)]
    fn find_candidate_batch(batches: &[ConstraintBatch], dynamic_bodies: &[usize]) -> Option<usize> {
        batches.iter().position(|batch| batch.can_fit(dynamic_bodies))
    }
}

/// Cell and batch assignment of one solve's constraints, plus the tables addressing them.
///
/// After [`ConstraintPartition::apply`] the constraint array is ordered by (cell, batch), so every cell occupies
/// `offsets_per_cell[cell]..offsets_per_cell[cell] + counts_per_cell[cell]` and every batch a sub-range of that.
/// A cell's sequential fallback constraints come after its regular batches.
#[derive(Clone, Debug)]
pub struct ConstraintPartition {
    cell_of: Vec<u32>,
    batch_of: Vec<u32>,
    order: Vec<u32>,
    counts_per_cell: Vec<u32>,
    offsets_per_cell: Vec<u32>,
    batch_starts: Vec<Vec<u32>>,
    fallback: SequentialFallbackBatch,
    max_batches_per_cell: u32,
}

impl ConstraintPartition {
    #[inline(always)]
    pub fn constraint_count(&self) -> usize {
        self.cell_of.len()
    }

    #[inline(always)]
    pub fn cell_count(&self) -> usize {
        self.counts_per_cell.len()
    }

    /// Cell of each constraint, indexed in the constraints' original order.
    #[inline(always)]
    pub fn cell_of(&self) -> &[u32] {
        &self.cell_of
    }

    /// Batch of each constraint, indexed in the constraints' original order.
    #[inline(always)]
    pub fn batch_of(&self) -> &[u32] {
        &self.batch_of
    }

    /// Original constraint index at each position of the sorted array.
    #[inline(always)]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    #[inline(always)]
    pub fn counts_per_cell(&self) -> &[u32] {
        &self.counts_per_cell
    }

    #[inline(always)]
    pub fn offsets_per_cell(&self) -> &[u32] {
        &self.offsets_per_cell
    }

    #[inline(always)]
    pub fn cell_range(&self, cell: u32) -> Range<usize> {
        let start = self.offsets_per_cell[cell as usize] as usize;
        start..start + self.counts_per_cell[cell as usize] as usize
    }

    /// Number of regular batches used by a cell.
    #[inline(always)]
    pub fn batch_count(&self, cell: u32) -> usize {
        self.batch_starts[cell as usize].len() - 1
    }

    #[inline(always)]
    pub fn batch_range(&self, cell: u32, batch: usize) -> Range<usize> {
        let starts = &self.batch_starts[cell as usize];
        starts[batch] as usize..starts[batch + 1] as usize
    }

    /// Range of a cell's sequential fallback constraints in the sorted array.
    #[inline(always)]
    pub fn fallback_range(&self, cell: u32) -> Range<usize> {
        let starts = &self.batch_starts[cell as usize];
        starts[starts.len() - 1] as usize..self.cell_range(cell).end
    }

    /// Batch id given to sequential fallback constraints.
    #[inline(always)]
    pub fn fallback_batch_id(&self) -> u32 {
        self.max_batches_per_cell
    }

    #[inline(always)]
    pub fn fallback(&self) -> &SequentialFallbackBatch {
        &self.fallback
    }

    pub fn fallback_constraint_count(&self) -> usize {
        self.fallback.constraint_count()
    }

    pub fn max_batches_in_cell(&self) -> usize {
        (0..self.cell_count() as u32)
            .map(|cell| self.batch_count(cell))
            .max()
            .unwrap_or(0)
    }

    pub fn occupied_cells(&self) -> usize {
        self.counts_per_cell.iter().filter(|&&count| count > 0).count()
    }

    pub fn status(&self) -> ScheduleStatus {
        match self.fallback_constraint_count() {
            0 => ScheduleStatus::Succeeded,
            fallback_constraints => ScheduleStatus::Degraded {
                fallback_constraints,
            },
        }
    }

    /// Reorders constraints into (cell, batch) order and records each one's assignment in it.
    pub fn apply(&self, constraints: &mut Vec<ContactConstraint>) {
        debug_assert_eq!(constraints.len(), self.order.len());
        let sorted = self
            .order
            .iter()
            .map(|&index| {
                let mut constraint = constraints[index as usize];
                constraint.cell = self.cell_of[index as usize];
                constraint.batch = self.batch_of[index as usize];
                constraint
            })
            .collect();
        *constraints = sorted;
    }

    /// Re-checks the conflict-freedom of every (cell, batch) group of the sorted constraints.
    ///
    /// Returns the number of bodies that appear in more than one cell of a cell-batch during the same batch round.
    /// Those bodies are not a partition error, but concurrently solved cells will sum their velocity changes.
    pub fn check_constraint_batches(
        &self,
        sorted: &[ContactConstraint],
        bodies: &[SolverBody],
        grid: &CellGrid,
    ) -> Result<usize, SolverError> {
        for cell in 0..self.cell_count() as u32 {
            for batch in 0..self.batch_count(cell) {
                let mut seen = HashSet::new();
                for constraint in &sorted[self.batch_range(cell, batch)] {
                    debug_assert_eq!(constraint.cell, cell);
                    for body in constraint.dynamic_bodies(bodies) {
                        if !seen.insert(body) {
                            return Err(SolverError::PartitionConflict {
                                cell,
                                batch: batch as u32,
                                body,
                            });
                        }
                    }
                }
            }
        }

        let mut shared_bodies = 0;
        for cells in grid.cell_batches() {
            let rounds = cells.iter().map(|&cell| self.batch_count(cell)).max().unwrap_or(0);
            for round in 0..=rounds {
                let mut owners: HashMap<u32, u32> = HashMap::new();
                let mut shared = HashSet::new();
                for &cell in cells {
                    let range = if round < self.batch_count(cell) {
                        self.batch_range(cell, round)
                    } else if round == rounds {
                        self.fallback_range(cell)
                    } else {
                        continue;
                    };
                    for constraint in &sorted[range] {
                        for body in constraint.dynamic_bodies(bodies) {
                            let owner = *owners.entry(body).or_insert(cell);
                            if owner != cell {
                                shared.insert(body);
                            }
                        }
                    }
                }
                shared_bodies += shared.len();
            }
        }
        if shared_bodies > 0 {
            warn!(
                "{} bodies are shared between concurrently solved cells; their velocity changes will be summed",
                shared_bodies
            );
        }
        Ok(shared_bodies)
    }
}
