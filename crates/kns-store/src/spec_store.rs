use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};

use async_lock::RwLock;
use serde::{Serialize, Deserialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use kns_metadata::core::{ObjectMeta, Resource};
use kns_metadata::extended::SpecExt;

use crate::{Precondition, NameSpace, Result, StoreError};

const FILE_EXTENSION: &str = "yaml";
const EMPTY_SEGMENT: &str = "_";

/// Objects of a single kind, kept as yaml values.
/// When a directory is attached every write is flushed to one file per key.
#[derive(Debug, Default)]
pub(crate) struct SpecStore {
    data: RwLock<HashMap<String, Value>>,
    path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "storage-version")]
enum VersionedStorage {
    #[serde(rename = "1")]
    V1 { resource: Value },
}

#[derive(Deserialize)]
struct StoredMeta {
    metadata: ObjectMeta,
}

fn store_key(meta: &ObjectMeta) -> String {
    format!("{}/{}/{}", meta.cluster, meta.namespace, meta.name)
}

fn segment(value: &str) -> &str {
    if value.is_empty() { EMPTY_SEGMENT } else { value }
}

/// every part of the key must stay a single path component
fn check_key(meta: &ObjectMeta) -> Result<()> {
    for value in [&meta.cluster, &meta.namespace, &meta.name] {
        if value.contains(['/', '\\']) || value == "." || value == ".." {
            return Err(StoreError::InvalidName(value.to_owned()));
        }
    }
    Ok(())
}

impl SpecStore {
    /// load every object found under `path`, laid out as cluster/namespace/name.yaml
    pub(crate) fn load<P: AsRef<Path>>(path: P, label: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|err| StoreError::io(&path, err))?;

        let mut data = HashMap::new();
        let mut dirs = vec![path.clone()];
        while let Some(dir) = dirs.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;
            for entry in entries.flatten() {
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    dirs.push(entry_path);
                    continue;
                }
                if entry_path.extension() != Some(OsStr::new(FILE_EXTENSION)) {
                    continue;
                }
                match Self::load_file(&entry_path) {
                    Ok((key, value)) => {
                        debug!(kind = label, key, "loaded");
                        data.insert(key, value);
                    }
                    Err(err) => {
                        warn!("skipped spec file {}: {err}", entry_path.display());
                    }
                }
            }
        }

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    fn load_file(path: &Path) -> Result<(String, Value)> {
        let file = File::open(path).map_err(|err| StoreError::io(path, err))?;
        let VersionedStorage::V1 { resource } = serde_yaml::from_reader(file)?;
        let stored: StoredMeta = serde_yaml::from_value(resource.clone())?;
        Ok((store_key(&stored.metadata), resource))
    }

    fn file_path(&self, meta: &ObjectMeta) -> Option<PathBuf> {
        self.path.as_ref().map(|path| {
            path.join(segment(&meta.cluster))
                .join(segment(&meta.namespace))
                .join(format!("{}.{FILE_EXTENSION}", meta.name))
        })
    }

    fn flush(&self, meta: &ObjectMeta, value: &Value) -> Result<()> {
        let Some(file_path) = self.file_path(meta) else {
            return Ok(());
        };
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        let file = File::create(&file_path).map_err(|err| StoreError::io(&file_path, err))?;
        let storage = VersionedStorage::V1 {
            resource: value.clone(),
        };
        serde_yaml::to_writer(&file, &storage)?;
        file.sync_all().map_err(|err| StoreError::io(&file_path, err))
    }

    fn remove_file(&self, meta: &ObjectMeta) {
        if let Some(file_path) = self.file_path(meta) {
            if let Err(err) = std::fs::remove_file(&file_path) {
                warn!("unable to delete spec file {}: {err}", file_path.display());
            }
        }
    }

    pub(crate) async fn get<S: SpecExt>(&self, key: &str) -> Result<Option<Resource<S>>> {
        let lock = self.data.read().await;
        let Some(value) = lock.get(key) else {
            return Ok(None);
        };

        let output = value.clone();
        drop(lock);

        Ok(Some(serde_yaml::from_value(output)?))
    }

    pub(crate) async fn items<S: SpecExt>(&self, namespace: &NameSpace) -> Result<Vec<Resource<S>>> {
        let lock = self.data.read().await;
        let mut items = lock
            .values()
            .map(|value| serde_yaml::from_value::<Resource<S>>(value.clone()))
            .filter(|item| match item {
                Ok(resource) => namespace.matches(resource.namespace()),
                Err(_) => true,
            })
            .collect::<Result<Vec<_>, _>>()?;
        drop(lock);

        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    pub(crate) async fn insert<S: SpecExt>(
        &self,
        mut resource: Resource<S>,
        precondition: Precondition,
    ) -> Result<Resource<S>> {
        check_key(&resource.metadata)?;
        let key = store_key(&resource.metadata);
        let mut lock = self.data.write().await;

        let current = match lock.get(&key) {
            Some(value) => {
                let stored: StoredMeta = serde_yaml::from_value(value.clone())?;
                Some(stored.metadata.resource_version)
            }
            None => None,
        };

        match (precondition, current) {
            (Precondition::None, _) => {}
            (Precondition::Absent, None) => {}
            (Precondition::Absent, Some(actual)) => {
                return Err(StoreError::Conflict {
                    key,
                    expected: 0,
                    actual,
                });
            }
            (Precondition::Revision(expected), actual) => {
                let actual = actual.unwrap_or_default();
                if expected != actual {
                    return Err(StoreError::Conflict {
                        key,
                        expected,
                        actual,
                    });
                }
            }
        }

        resource.metadata.resource_version = current.unwrap_or_default() + 1;
        let value = serde_yaml::to_value(&resource)?;
        self.flush(&resource.metadata, &value)?;
        lock.insert(key, value);
        drop(lock);

        debug!(kind = S::LABEL, name = %resource.metadata.name, revision = resource.metadata.resource_version, "stored");
        Ok(resource)
    }

    pub(crate) async fn remove<S: SpecExt>(&self, key: &str) -> Result<bool> {
        let mut lock = self.data.write().await;
        let Some(value) = lock.remove(key) else {
            return Ok(false);
        };
        drop(lock);

        let stored: StoredMeta = serde_yaml::from_value(value)?;
        self.remove_file(&stored.metadata);
        debug!(kind = S::LABEL, key, "removed");
        Ok(true)
    }
}
