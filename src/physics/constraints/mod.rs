pub mod contact;

mod velocity_store;
pub use self::velocity_store::*;
