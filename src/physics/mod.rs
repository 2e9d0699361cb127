pub mod backend;
pub mod collision_detection;
pub mod constraints;

mod body_properties;
pub use self::body_properties::*;

mod cell_grid;
pub use self::cell_grid::*;

mod conflict_batcher;
pub use self::conflict_batcher::*;

mod constraint_batch;
pub use self::constraint_batch::*;

mod constraint_converter;
pub use self::constraint_converter::*;

mod errors;
pub use self::errors::*;

mod helpers;
pub use self::helpers::*;

mod impulse_solver;
pub use self::impulse_solver::*;

mod sequential_fallback_batch;
pub use self::sequential_fallback_batch::*;

mod solve_description;
pub use self::solve_description::*;

mod solver;
pub use self::solver::*;

mod warm_start;
pub use self::warm_start::*;
