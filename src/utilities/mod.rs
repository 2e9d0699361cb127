mod collections;
pub use self::collections::*;

mod symmetric3x3;
pub use self::symmetric3x3::*;

mod thread_dispatcher;
pub use self::thread_dispatcher::*;
