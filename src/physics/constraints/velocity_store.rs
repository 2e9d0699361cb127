use std::collections::HashMap;

use crate::physics::body_properties::{BodyVelocity, SolverBody};

/// Controls when velocity changes computed for one contact become visible to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateMode {
    /// Projected Gauss-Seidel: every contact sees the velocities written by the contacts before it.
    #[default]
    Sequential,
    /// Jacobi: all contacts of a constraint read the velocities from the start of the constraint and their changes are
    /// applied together at its end.
    Jacobi,
}

/// Source and sink of body velocities for the per-constraint solve functions.
///
/// The same constraint math runs against the host's body buffer and against a parallel task's private overlay.
pub trait VelocityStore {
    /// Loads the solver state of a body, including its latest velocity.
    fn load(&self, index: u32) -> SolverBody;

    /// Writes the velocity of a dynamic body.
    fn store(&mut self, index: u32, velocity: BodyVelocity);
}

impl VelocityStore for [SolverBody] {
    #[inline(always)]
    fn load(&self, index: u32) -> SolverBody {
        self[index as usize]
    }

    #[inline(always)]
    fn store(&mut self, index: u32, velocity: BodyVelocity) {
        let body = &mut self[index as usize];
        debug_assert!(body.dynamic, "Only dynamic bodies should be written.");
        body.velocity = velocity;
    }
}

/// Task-local view over a shared body snapshot. Writes stay in the overlay until the task hands them back.
pub struct OverlayVelocities<'a> {
    bodies: &'a [SolverBody],
    overlay: HashMap<u32, BodyVelocity>,
}

impl<'a> OverlayVelocities<'a> {
    pub fn new(bodies: &'a [SolverBody]) -> Self {
        Self {
            bodies,
            overlay: HashMap::new(),
        }
    }

    /// Consumes the overlay, returning every written velocity ordered by body index.
    pub fn into_updates(self) -> Vec<(u32, BodyVelocity)> {
        let mut updates: Vec<_> = self.overlay.into_iter().collect();
        updates.sort_unstable_by_key(|&(index, _)| index);
        updates
    }
}

impl VelocityStore for OverlayVelocities<'_> {
    #[inline(always)]
    fn load(&self, index: u32) -> SolverBody {
        let mut body = self.bodies[index as usize];
        if let Some(velocity) = self.overlay.get(&index) {
            body.velocity = *velocity;
        }
        body
    }

    #[inline(always)]
    fn store(&mut self, index: u32, velocity: BodyVelocity) {
        debug_assert!(
            self.bodies[index as usize].dynamic,
            "Only dynamic bodies should be written."
        );
        self.overlay.insert(index, velocity);
    }
}
