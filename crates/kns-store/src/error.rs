use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

use kns_types::Revision;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Yaml serialization error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: IoError },
    #[error("name {0:?} cannot be used as a storage key")]
    InvalidName(String),
    #[error("concurrent modification of {key}: expected revision {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: Revision,
        actual: Revision,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
