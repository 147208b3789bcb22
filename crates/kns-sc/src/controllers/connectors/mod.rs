mod reducer;
mod controller;

pub use self::reducer::*;
pub use self::controller::ConnectorReconciler;
