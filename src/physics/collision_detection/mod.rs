mod contact_manifold;
pub use self::contact_manifold::*;
