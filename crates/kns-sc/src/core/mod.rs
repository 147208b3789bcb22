mod context;
mod events;
mod registry;

pub use self::context::*;
pub use self::events::*;
pub use self::registry::*;
