//! Cell-partitioned contact constraint solver for rigid bodies.
//!
//! Contact manifolds from collision detection are converted into four-point contact constraints, scheduled into
//! spatial cells and conflict-free batches, and resolved with a fixed number of sequential impulse iterations. The
//! same per-constraint math runs on a single threaded host backend and on a parallel backend that solves the cells of
//! a cell-batch concurrently.
//!
//! ```
//! use glam::Vec3;
//! use rust_contact_solver::physics::{BodyInertia, RigidBody, SolveDescription, Solver};
//! use rust_contact_solver::physics::collision_detection::ContactManifold;
//!
//! let mut bodies = vec![
//!     RigidBody::new(Vec3::new(0.0, 0.5, 0.0), 1.0).with_linear_velocity(Vec3::new(0.0, -2.0, 0.0)),
//!     RigidBody::new_static(Vec3::ZERO),
//! ];
//! let inertias = vec![BodyInertia::solid_sphere(1.0, 0.5), BodyInertia::STATIC];
//! let manifolds = vec![ContactManifold::new(0, 1, Vec3::Y).with_point(Vec3::ZERO, 0.005)];
//!
//! let mut solver = Solver::host(SolveDescription::default()).unwrap();
//! solver.solve(&mut bodies, &inertias, &manifolds, None).unwrap();
//! assert!(bodies[0].linear_velocity.y > -1e-4);
//! ```

pub mod physics;
pub mod utilities;

pub use physics::backend::{ExecutionBackend, HostBackend, HostTraversal, ParallelBackend};
pub use physics::collision_detection::ContactManifold;
pub use physics::{SolveDescription, SolveReport, Solver, SolverError};
