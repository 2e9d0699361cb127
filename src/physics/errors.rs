use thiserror::Error;

/// Failures reported by the contact solver.
///
/// The per-constraint math never fails; everything here is detected while validating input, partitioning, or in
/// verification mode.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SolverError {
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("iteration count must be at least 1")]
    InvalidIterationCount,
    #[error("at least one batch per cell is required")]
    InvalidBatchLimit,
    #[error("grid split {x}x{y}x{z} must consist of non-zero powers of two and hold at most 65536 cells")]
    InvalidGridSplit { x: u32, y: u32, z: u32 },
    #[error("invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("{body_count} bodies were provided with {inertia_count} inertias")]
    InertiaCountMismatch {
        body_count: usize,
        inertia_count: usize,
    },
    #[error("manifold {manifold} references body {body}, but only {body_count} bodies exist")]
    BodyIndexOutOfRange {
        manifold: usize,
        body: u32,
        body_count: usize,
    },
    #[error("manifold {manifold} pairs body {body} with itself")]
    DegeneratePair { manifold: usize, body: u32 },
    #[error("manifold {manifold} has {count} contact points; at most 4 are supported")]
    TooManyContactPoints { manifold: usize, count: usize },
    #[error("cell {cell} ran out of its {max_batches} batches while scheduling manifold {manifold}")]
    PartitionOverflow {
        cell: u32,
        manifold: usize,
        max_batches: u32,
    },
    #[error("body {body} appears more than once in batch {batch} of cell {cell}")]
    PartitionConflict { cell: u32, batch: u32, body: u32 },
    #[error("body {body} has a non-finite velocity after solving")]
    NonFiniteVelocity { body: u32 },
}

/// Outcome of scheduling the constraints of one solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// Every constraint was placed into a conflict-free batch.
    Succeeded,
    /// Some constraints overflowed their cell's batches and were solved sequentially.
    Degraded { fallback_constraints: usize },
}

impl ScheduleStatus {
    #[inline(always)]
    pub fn is_degraded(&self) -> bool {
        matches!(self, ScheduleStatus::Degraded { .. })
    }
}
