pub mod policy;
pub mod validation;
pub mod apply;

pub use apply::{ApplyOutcome, ApplyResult, ApplyService, ApplySpec, ImportSpec};
pub use policy::RepositoryPolicy;
