use crate::physics::cell_grid::GridSplit;
use crate::physics::errors::SolverError;

/// Chooses the point used to place a constraint into a spatial cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellAnchor {
    /// Position of body A, or of body B when A is not dynamic.
    #[default]
    DynamicBody,
    /// Mean of the manifold's contact points.
    ContactCenter,
}

/// What the batcher does with a constraint that fits none of its cell's batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverflowPolicy {
    /// Move the constraint into the cell's sequential fallback batch and report a degraded schedule.
    #[default]
    SequentialFallback,
    /// Fail the solve with [`SolverError::PartitionOverflow`].
    Reject,
}

/// Describes how the solver converts, schedules and iterates contact constraints.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolveDescription {
    /// Duration of the step the velocities are solved for.
    pub time_step: f32,
    /// Penetration depth tolerated without any corrective velocity.
    pub position_drift: f32,
    /// Fraction of the penetration beyond the drift corrected per second of simulated time.
    pub position_constraint_coeff: f32,
    /// Body index treated as immovable regardless of its inverse mass.
    pub static_body_index: Option<u32>,
    /// Number of passes for each of the contact and friction phases.
    pub iteration_count: u32,
    /// Number of synchronized batches a cell may use before overflowing.
    pub max_batches_per_cell: u32,
    /// Number of cells along each axis of the spatial grid.
    pub grid_split: GridSplit,
    /// Typical size of a body in the scene. Controls the cell size together with `objects_per_cell`.
    pub average_object_extent: f32,
    /// Number of average sized objects spanning one cell.
    pub objects_per_cell: f32,
    pub cell_anchor: CellAnchor,
    pub overflow_policy: OverflowPolicy,
    /// Squared closing speed below which restitution is ignored.
    pub restitution_cutoff_sq: f32,
    /// Fraction of the angular velocity around the normal removed during each friction update of a damped pair.
    pub angular_damping: f32,
    /// Cosine above which the contact center is considered colinear with the two body positions.
    pub colinearity_threshold: f32,
    /// Apply accumulated impulses from a warm start cache before iterating.
    pub warm_starting: bool,
    /// Re-check the partition and the solved velocities, failing the solve on violations.
    pub verify: bool,
}

impl SolveDescription {
    /// Default number of synchronized constraint batches to use before falling back to an alternative solving method.
    pub const DEFAULT_FALLBACK_BATCH_THRESHOLD: u32 = 64;
    pub const DEFAULT_ITERATION_COUNT: u32 = 4;

    /// Creates a solve description for the given step duration with every other setting at its default.
    pub fn new(time_step: f32) -> Self {
        Self {
            time_step,
            ..Default::default()
        }
    }

    /// Checks every setting, returning the first problem found.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(SolverError::InvalidTimeStep(self.time_step));
        }
        if self.iteration_count == 0 {
            return Err(SolverError::InvalidIterationCount);
        }
        if self.max_batches_per_cell == 0 {
            return Err(SolverError::InvalidBatchLimit);
        }
        if !self.grid_split.is_valid() {
            return Err(SolverError::InvalidGridSplit {
                x: self.grid_split.x,
                y: self.grid_split.y,
                z: self.grid_split.z,
            });
        }
        check_parameter("position_drift", self.position_drift, |v| v >= 0.0)?;
        check_parameter(
            "position_constraint_coeff",
            self.position_constraint_coeff,
            |v| v >= 0.0,
        )?;
        check_parameter("average_object_extent", self.average_object_extent, |v| {
            v > 0.0
        })?;
        check_parameter("objects_per_cell", self.objects_per_cell, |v| v > 0.0)?;
        check_parameter("restitution_cutoff_sq", self.restitution_cutoff_sq, |v| {
            v >= 0.0
        })?;
        check_parameter("angular_damping", self.angular_damping, |v| {
            (0.0..=1.0).contains(&v)
        })?;
        check_parameter("colinearity_threshold", self.colinearity_threshold, |v| {
            (-1.0..=1.0).contains(&v)
        })?;
        Ok(())
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_position_correction(mut self, position_drift: f32, position_constraint_coeff: f32) -> Self {
        self.position_drift = position_drift;
        self.position_constraint_coeff = position_constraint_coeff;
        self
    }

    pub fn with_static_body_index(mut self, static_body_index: Option<u32>) -> Self {
        self.static_body_index = static_body_index;
        self
    }

    pub fn with_iteration_count(mut self, iteration_count: u32) -> Self {
        self.iteration_count = iteration_count;
        self
    }

    pub fn with_max_batches_per_cell(mut self, max_batches_per_cell: u32) -> Self {
        self.max_batches_per_cell = max_batches_per_cell;
        self
    }

    pub fn with_grid_split(mut self, grid_split: GridSplit) -> Self {
        self.grid_split = grid_split;
        self
    }

    pub fn with_average_object_extent(mut self, average_object_extent: f32) -> Self {
        self.average_object_extent = average_object_extent;
        self
    }

    pub fn with_objects_per_cell(mut self, objects_per_cell: f32) -> Self {
        self.objects_per_cell = objects_per_cell;
        self
    }

    pub fn with_cell_anchor(mut self, cell_anchor: CellAnchor) -> Self {
        self.cell_anchor = cell_anchor;
        self
    }

    pub fn with_overflow_policy(mut self, overflow_policy: OverflowPolicy) -> Self {
        self.overflow_policy = overflow_policy;
        self
    }

    pub fn with_angular_damping(mut self, angular_damping: f32, colinearity_threshold: f32) -> Self {
        self.angular_damping = angular_damping;
        self.colinearity_threshold = colinearity_threshold;
        self
    }

    pub fn with_restitution_cutoff_sq(mut self, restitution_cutoff_sq: f32) -> Self {
        self.restitution_cutoff_sq = restitution_cutoff_sq;
        self
    }

    pub fn with_warm_starting(mut self, warm_starting: bool) -> Self {
        self.warm_starting = warm_starting;
        self
    }

    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for SolveDescription {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            position_drift: 0.005,
            position_constraint_coeff: 0.2,
            static_body_index: None,
            iteration_count: Self::DEFAULT_ITERATION_COUNT,
            max_batches_per_cell: Self::DEFAULT_FALLBACK_BATCH_THRESHOLD,
            grid_split: GridSplit::default(),
            average_object_extent: 1.0,
            objects_per_cell: 10.0,
            cell_anchor: CellAnchor::default(),
            overflow_policy: OverflowPolicy::default(),
            restitution_cutoff_sq: 0.004,
            angular_damping: 0.1,
            colinearity_threshold: 0.95,
            warm_starting: true,
            verify: false,
        }
    }
}

#[inline]
fn check_parameter(
    name: &'static str,
    value: f32,
    accept: impl Fn(f32) -> bool,
) -> Result<(), SolverError> {
    if value.is_finite() && accept(value) {
        Ok(())
    } else {
        Err(SolverError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SolveDescription::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let description = SolveDescription::new(0.0);
        assert_eq!(description.validate(), Err(SolverError::InvalidTimeStep(0.0)));
        let description = SolveDescription::new(f32::NAN);
        assert!(matches!(
            description.validate(),
            Err(SolverError::InvalidTimeStep(_))
        ));
    }

    #[test]
    fn test_rejects_non_power_of_two_split() {
        let description = SolveDescription::default().with_grid_split(GridSplit::new(4, 3, 4));
        assert_eq!(
            description.validate(),
            Err(SolverError::InvalidGridSplit { x: 4, y: 3, z: 4 })
        );
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let description = SolveDescription::default().with_grid_split(GridSplit::new(4096, 4096, 4096));
        assert_eq!(
            description.validate(),
            Err(SolverError::InvalidGridSplit {
                x: 4096,
                y: 4096,
                z: 4096
            })
        );
        let largest = SolveDescription::default().with_grid_split(GridSplit::new(64, 32, 32));
        assert_eq!(largest.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_counts() {
        assert_eq!(
            SolveDescription::default()
                .with_iteration_count(0)
                .validate(),
            Err(SolverError::InvalidIterationCount)
        );
        assert_eq!(
            SolveDescription::default()
                .with_max_batches_per_cell(0)
                .validate(),
            Err(SolverError::InvalidBatchLimit)
        );
    }

    #[test]
    fn test_rejects_out_of_range_damping() {
        let description = SolveDescription::default().with_angular_damping(1.5, 0.95);
        assert_eq!(
            description.validate(),
            Err(SolverError::InvalidParameter {
                name: "angular_damping",
                value: 1.5
            })
        );
    }
}
