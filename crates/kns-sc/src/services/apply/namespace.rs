use tracing::{info, instrument};

use kns_auth::{Authorization, Identity};
use kns_metadata::acl::AccessControlEntrySpec;
use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::{Resource, ResourceKey};
use kns_metadata::extended::{ResourceKind, SpecExt};
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::rolebinding::RoleBindingSpec;
use kns_metadata::topic::TopicSpec;
use kns_store::{NameSpace, ResourceRepository};

use crate::core::ResourceAction;
use crate::services::validation::validate_namespace;
use crate::{Result, ScError};

use super::{ApplyOutcome, ApplyService};

impl<R, A> ApplyService<R, A>
where
    R: ResourceRepository,
    A: Authorization,
{
    fn require_admin(identity: &Identity, action: &str) -> Result<()> {
        if identity.admin {
            Ok(())
        } else {
            Err(ScError::Authorization(format!(
                "Only an admin can {action} a namespace"
            )))
        }
    }

    /// Namespace names are unique across clusters, so their writes
    /// serialize on a key without cluster.
    fn name_lock_key(name: &str) -> ResourceKey {
        ResourceKey::new("", name, ResourceKind::Namespace, name)
    }

    /// `Kind name` of every resource stored in the namespace
    async fn contents<S: SpecExt>(&self, namespace: &str) -> Result<Vec<String>> {
        let items = self
            .ctx
            .repo()
            .list::<S>(&NameSpace::from(namespace))
            .await?;
        Ok(items
            .iter()
            .map(|item| format!("{} {}", S::LABEL, item.name()))
            .collect())
    }

    /// create or update a namespace, admin only
    #[instrument(skip_all, fields(name = %resource.name()))]
    pub async fn apply_namespace(
        &self,
        identity: &Identity,
        resource: Resource<NamespaceSpec>,
        dry_run: bool,
    ) -> Result<ApplyOutcome<NamespaceSpec>> {
        let identity = self.effective(identity);
        Self::require_admin(&identity, "apply")?;

        let mut submitted = resource.normalize();
        submitted.metadata.namespace = submitted.name().to_owned();
        submitted.status = None;

        let errors = validate_namespace(self.ctx.config(), &submitted);
        if !errors.is_empty() {
            return Err(ScError::Validation(errors));
        }

        let _guard = self.ctx.locks().lock(&Self::name_lock_key(submitted.name())).await;
        let key = submitted.key();
        let existing = self.ctx.repo().get::<NamespaceSpec>(&key).await?;
        if let Some(stored) = &existing {
            if stored.cluster() != submitted.cluster() {
                return Err(ScError::Validation(vec![format!(
                    "Invalid value {} for configuration cluster: Value is immutable ({})",
                    submitted.cluster(),
                    stored.cluster()
                )]));
            }
        } else if self.namespace(submitted.name()).await.is_ok() {
            return Err(ScError::Validation(vec![format!(
                "Invalid value {} for configuration cluster: Namespace already exists on another cluster",
                submitted.cluster()
            )]));
        }

        self.commit(&key, submitted, existing, None, dry_run).await
    }

    /// delete an empty namespace, admin only
    #[instrument(skip(self, identity))]
    pub async fn delete_namespace(
        &self,
        identity: &Identity,
        name: &str,
        dry_run: bool,
    ) -> Result<Resource<NamespaceSpec>> {
        let identity = self.effective(identity);
        Self::require_admin(&identity, "delete")?;

        let _guard = self.ctx.locks().lock(&Self::name_lock_key(name)).await;
        let namespace = self.namespace(name).await?;
        let key = namespace.key();

        let mut contents = self.contents::<TopicSpec>(name).await?;
        contents.extend(self.contents::<ConnectorSpec>(name).await?);
        contents.extend(self.contents::<AccessControlEntrySpec>(name).await?);
        contents.extend(self.contents::<RoleBindingSpec>(name).await?);
        if !contents.is_empty() {
            return Err(ScError::Validation(
                contents
                    .into_iter()
                    .map(|item| format!("Namespace not empty: {item}"))
                    .collect(),
            ));
        }
        if dry_run {
            return Ok(namespace);
        }

        self.ctx.repo().delete::<NamespaceSpec>(&key).await?;
        info!(%key, "namespace deleted");
        self.ctx
            .events()
            .emit(ResourceAction::Deleted, key)
            .await;
        Ok(namespace)
    }
}
