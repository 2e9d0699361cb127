mod contact_constraint;
pub use self::contact_constraint::*;

pub(crate) mod penetration_limit;
pub use self::penetration_limit::PenetrationLimit;

mod tangent_friction;
pub use self::tangent_friction::*;
