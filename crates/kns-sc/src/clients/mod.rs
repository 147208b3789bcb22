//!
//! # Remote clients
//!
//! Broker admin and connect runtime seen as black boxes. Every call made by
//! the control plane goes through [`bounded`].
//!
mod broker;
mod connect;
pub mod memory;

pub use broker::*;
pub use connect::*;

use std::future::Future;
use std::time::Duration;

use fluvio_future::future::timeout;

use crate::RemoteError;

/// run a remote call, expiring after `limit`
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
    T: Send + 'static,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
