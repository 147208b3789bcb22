//!
//! # Reconciliation executors
//!
//! One executor per managed cluster and kind. Executors share nothing but the
//! repository and the remote clients.
//!
pub mod topics;
pub mod connectors;
pub mod acls;

mod ticker;
mod executor;
mod status;

pub use ticker::Ticker;
pub use executor::{CycleReport, Executor, ExecutorController};
pub use status::update_status;
