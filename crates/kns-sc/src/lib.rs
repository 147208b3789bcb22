#[macro_use]
pub mod config;
pub mod core;
pub mod clients;
pub mod services;
pub mod controllers;

mod error;
mod init;

pub use error::{ScError, RemoteError, Result};
pub use init::start_main_loop;
