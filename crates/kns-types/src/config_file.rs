use std::fmt::Debug;
use std::io::Error as IoError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::fs::{File, read_to_string};

use tracing::debug;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("unable to read config {path}: {source}")]
    IoError { path: PathBuf, source: IoError },
    #[error("invalid toml: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("unable to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// TOML persistence for any serde config type
pub trait SaveLoadConfig {
    fn save_to<T: AsRef<Path>>(&self, path: T) -> Result<(), LoadConfigError>;
    fn load_from<T: AsRef<Path>>(path: T) -> Result<Self, LoadConfigError>
    where
        Self: Sized;
    fn load_str(config: &str) -> Result<Self, LoadConfigError>
    where
        Self: Sized;
}

impl<S> SaveLoadConfig for S
where
    S: Serialize + DeserializeOwned + Debug,
{
    fn save_to<T: AsRef<Path>>(&self, path: T) -> Result<(), LoadConfigError> {
        let path_ref = path.as_ref();
        debug!("saving config: {:#?} to: {:#?}", self, path_ref);
        let toml = toml::to_string(self)?;

        let io_err = |source| LoadConfigError::IoError {
            path: path_ref.to_owned(),
            source,
        };
        let mut file = File::create(path_ref).map_err(io_err)?;
        file.write_all(toml.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)
    }

    fn load_from<T: AsRef<Path>>(path: T) -> Result<Self, LoadConfigError> {
        let path_ref = path.as_ref();
        debug!(?path_ref, "loading from");

        let file_str = read_to_string(path_ref).map_err(|source| LoadConfigError::IoError {
            path: path_ref.to_owned(),
            source,
        })?;

        Self::load_str(&file_str)
    }

    fn load_str(config: &str) -> Result<Self, LoadConfigError> {
        Ok(toml::from_str(config)?)
    }
}

#[cfg(test)]
mod test {

    use serde::{Deserialize, Serialize};

    use super::{LoadConfigError, SaveLoadConfig};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        retries: u16,
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sample.toml");
        let sample = Sample {
            name: "local".to_owned(),
            retries: 4,
        };
        sample.save_to(&path).expect("save");
        let loaded = Sample::load_from(&path).expect("load");
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_missing_file() {
        let err = Sample::load_from("/not/there.toml").expect_err("missing");
        assert!(matches!(err, LoadConfigError::IoError { .. }));
    }

    #[test]
    fn test_defaults_applied() {
        let sample = Sample::load_str(r#"name = "dev""#).expect("parse");
        assert_eq!(sample.retries, 0);
    }
}
