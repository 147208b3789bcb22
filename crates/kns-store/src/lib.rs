mod error;
mod repository;
mod spec_store;
mod locks;

pub mod memory;
pub mod local;

pub use error::StoreError;
pub use repository::*;
pub use locks::KeyLocks;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
