use std::time::Duration;

use thiserror::Error;

use kns_auth::AuthError;
use kns_store::StoreError;
use kns_types::config_file::LoadConfigError;

pub type Result<T, E = ScError> = std::result::Result<T, E>;

/// Failure reported by a broker or a connect runtime.
/// Messages are kept as the remote side sent them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{code}: {message}")]
    Broker { code: String, message: String },
    #[error("{status} {message}")]
    Http { status: u16, message: String },
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no client configured for {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub fn broker(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Broker {
            code: code.into(),
            message: message.into(),
        }
    }

    /// rejected by the remote rules, as opposed to an unreachable remote
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Broker { .. } | Self::Http { .. })
    }

    /// message suitable for a resource status or a validation error
    pub fn message(&self) -> String {
        match self {
            Self::Broker { message, .. } | Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScError {
    #[error("Validation failed: [{}]", .0.join(", "))]
    Validation(Vec<String>),
    #[error("Not authorized: {0}")]
    Authorization(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] LoadConfigError),
}

impl From<StoreError> for ScError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl ScError {
    /// complete list of reasons a request was rejected
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
