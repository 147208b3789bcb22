use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use kns_auth::{AuthError, PolicySource};
use kns_metadata::acl::{AccessControlEntrySpec, Permission};
use kns_metadata::rolebinding::RoleBindingSpec;
use kns_store::{NameSpace, ResourceRepository};

/// Authorization data read straight from the repository on every decision
#[derive(Debug)]
pub struct RepositoryPolicy<R> {
    repo: Arc<R>,
}

impl<R> RepositoryPolicy<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: ResourceRepository> PolicySource for RepositoryPolicy<R> {
    async fn role_bindings(&self, namespace: &str) -> Result<Vec<RoleBindingSpec>, AuthError> {
        let bindings = self
            .repo
            .list::<RoleBindingSpec>(&NameSpace::from(namespace))
            .await
            .map_err(|err| AuthError::PolicySource(err.to_string()))?;
        trace!(namespace, count = bindings.len(), "role bindings");
        Ok(bindings.into_iter().map(|rb| rb.spec).collect())
    }

    async fn owner_entries(
        &self,
        namespace: &str,
    ) -> Result<Vec<AccessControlEntrySpec>, AuthError> {
        let entries = self
            .repo
            .list::<AccessControlEntrySpec>(&NameSpace::All)
            .await
            .map_err(|err| AuthError::PolicySource(err.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|ace| ace.spec)
            .filter(|ace| ace.permission == Permission::Owner && ace.granted_to == namespace)
            .collect())
    }
}
