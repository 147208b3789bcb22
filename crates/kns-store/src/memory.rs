use std::collections::HashMap;
use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;

use kns_metadata::core::{Resource, ResourceKey};
use kns_metadata::extended::{ResourceKind, SpecExt};

use crate::spec_store::SpecStore;
use crate::{NameSpace, Precondition, ResourceRepository, Result};

/// Repository kept in process memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    data: Mutex<HashMap<ResourceKind, Arc<SpecStore>>>,
}

impl MemoryRepository {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn get_store<S: SpecExt>(&self) -> Arc<SpecStore> {
        let mut stores = self.data.lock().await;
        stores.entry(S::KIND).or_default().clone()
    }
}

#[async_trait]
impl ResourceRepository for MemoryRepository {
    async fn get<S: SpecExt>(&self, key: &ResourceKey) -> Result<Option<Resource<S>>> {
        let store = self.get_store::<S>().await;
        store.get(&key.store_key()).await
    }

    async fn list<S: SpecExt>(&self, namespace: &NameSpace) -> Result<Vec<Resource<S>>> {
        let store = self.get_store::<S>().await;
        store.items(namespace).await
    }

    async fn put<S: SpecExt>(
        &self,
        resource: Resource<S>,
        precondition: Precondition,
    ) -> Result<Resource<S>> {
        let store = self.get_store::<S>().await;
        store.insert(resource, precondition).await
    }

    async fn delete<S: SpecExt>(&self, key: &ResourceKey) -> Result<bool> {
        let store = self.get_store::<S>().await;
        store.remove::<S>(&key.store_key()).await
    }
}

#[cfg(test)]
mod test {

    use kns_metadata::core::{ObjectMeta, Resource};
    use kns_metadata::topic::{TopicSpec, TopicStatus};

    use crate::{NameSpace, Precondition, ResourceRepository};

    use super::MemoryRepository;

    fn topic(namespace: &str, name: &str, partitions: i32) -> Resource<TopicSpec> {
        Resource::new(
            ObjectMeta {
                name: name.to_owned(),
                namespace: namespace.to_owned(),
                cluster: "local".to_owned(),
                ..Default::default()
            },
            TopicSpec::new(partitions, 3),
        )
    }

    #[fluvio_future::test]
    async fn test_put_get_delete() {
        let repo = MemoryRepository::default();
        let stored = repo
            .put(topic("test", "test.a", 3), Precondition::Absent)
            .await
            .expect("put");
        assert_eq!(stored.revision(), 1);

        let fetched = repo
            .get::<TopicSpec>(&stored.key())
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(fetched, stored);

        assert!(repo.delete::<TopicSpec>(&stored.key()).await.expect("delete"));
        assert!(!repo.delete::<TopicSpec>(&stored.key()).await.expect("delete"));
        assert!(repo.get::<TopicSpec>(&stored.key()).await.expect("get").is_none());
    }

    #[fluvio_future::test]
    async fn test_list_by_namespace() {
        let repo = MemoryRepository::default();
        for (ns, name) in [("test", "test.b"), ("test", "test.a"), ("other", "other.a")] {
            repo.put(topic(ns, name, 1), Precondition::None)
                .await
                .expect("put");
        }

        let items = repo
            .list::<TopicSpec>(&NameSpace::from("test"))
            .await
            .expect("list");
        let names: Vec<_> = items.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["test.a", "test.b"]);

        let all = repo.list::<TopicSpec>(&NameSpace::All).await.expect("list");
        assert_eq!(all.len(), 3);
    }

    #[fluvio_future::test]
    async fn test_revision_conflict() {
        let repo = MemoryRepository::default();
        let first = repo
            .put(topic("test", "test.a", 1), Precondition::Absent)
            .await
            .expect("put");

        // status write by another party bumps the revision
        let with_status = first.clone().with_status(TopicStatus::success(""));
        repo.put(with_status, Precondition::Revision(first.revision()))
            .await
            .expect("status");

        let err = repo
            .put(topic("test", "test.a", 6), Precondition::Revision(first.revision()))
            .await
            .expect_err("stale revision");
        assert!(err.is_conflict());

        let err = repo
            .put(topic("test", "test.a", 6), Precondition::Absent)
            .await
            .expect_err("exists");
        assert!(err.is_conflict());
    }
}
