use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_lock::{RwLock, RwLockUpgradableReadGuard};
use async_trait::async_trait;

use kns_metadata::core::{Resource, ResourceKey};
use kns_metadata::extended::{ResourceKind, SpecExt};

use crate::spec_store::SpecStore;
use crate::{NameSpace, Precondition, ResourceRepository, Result};

/// Repository persisted as yaml files, one directory per kind
#[derive(Debug)]
pub struct LocalRepository {
    path: PathBuf,
    stores: RwLock<HashMap<ResourceKind, Arc<SpecStore>>>,
}

impl LocalRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let stores = Default::default();
        Self { path, stores }
    }

    async fn get_store<S: SpecExt>(&self) -> Result<Arc<SpecStore>> {
        let read = self.stores.upgradable_read().await;
        Ok(match read.get(&S::KIND) {
            Some(store) => store.clone(),
            None => {
                let mut write = RwLockUpgradableReadGuard::upgrade(read).await;
                let store = Arc::new(SpecStore::load(
                    self.path.join(S::KIND.route()),
                    S::LABEL,
                )?);
                write.insert(S::KIND, store.clone());
                store
            }
        })
    }
}

#[async_trait]
impl ResourceRepository for LocalRepository {
    async fn get<S: SpecExt>(&self, key: &ResourceKey) -> Result<Option<Resource<S>>> {
        let store = self.get_store::<S>().await?;
        store.get(&key.store_key()).await
    }

    async fn list<S: SpecExt>(&self, namespace: &NameSpace) -> Result<Vec<Resource<S>>> {
        let store = self.get_store::<S>().await?;
        store.items(namespace).await
    }

    async fn put<S: SpecExt>(
        &self,
        resource: Resource<S>,
        precondition: Precondition,
    ) -> Result<Resource<S>> {
        let store = self.get_store::<S>().await?;
        store.insert(resource, precondition).await
    }

    async fn delete<S: SpecExt>(&self, key: &ResourceKey) -> Result<bool> {
        let store = self.get_store::<S>().await?;
        store.remove::<S>(&key.store_key()).await
    }
}
