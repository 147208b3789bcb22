use std::fmt::Debug;

use async_trait::async_trait;

use kns_metadata::core::{Resource, ResourceKey};
use kns_metadata::extended::SpecExt;
use kns_types::Revision;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSpace {
    All,
    Named(String),
}

impl NameSpace {
    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == namespace,
        }
    }
}

impl From<&str> for NameSpace {
    fn from(namespace: &str) -> Self {
        Self::Named(namespace.to_owned())
    }
}

/// Write precondition on the revision currently stored under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// overwrite whatever is stored
    None,
    /// key must not exist yet
    Absent,
    /// stored revision must still be this one
    Revision(Revision),
}

impl Precondition {
    /// precondition matching a resource previously read from the repository
    pub fn from_existing<S: SpecExt>(existing: Option<&Resource<S>>) -> Self {
        match existing {
            Some(resource) => Self::Revision(resource.revision()),
            None => Self::Absent,
        }
    }
}

/// Desired state storage, keyed by (cluster, namespace, kind, name).
/// Every write of a key is atomic and bumps its revision.
#[async_trait]
pub trait ResourceRepository: Debug + Send + Sync + 'static {
    async fn get<S: SpecExt>(&self, key: &ResourceKey) -> Result<Option<Resource<S>>>;

    async fn list<S: SpecExt>(&self, namespace: &NameSpace) -> Result<Vec<Resource<S>>>;

    /// create or overwrite, returns the stored object with its new revision
    async fn put<S: SpecExt>(
        &self,
        resource: Resource<S>,
        precondition: Precondition,
    ) -> Result<Resource<S>>;

    /// true if something was removed
    async fn delete<S: SpecExt>(&self, key: &ResourceKey) -> Result<bool>;
}
