mod policy;
mod error;
mod identity;

pub mod rbac;

pub use policy::*;
pub use error::AuthError;
pub use identity::Identity;
