use thiserror::Error;

/// Possible errors from Auth
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("unable to read authorization policy: {0}")]
    PolicySource(String),
}
