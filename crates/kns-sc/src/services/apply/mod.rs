//!
//! # Apply pipeline
//!
//! Authorize, validate, diff against the stored object and persist.
//! Concurrent requests on the same key are serialized by a per-key lock,
//! writes racing with executor status updates are detected through the
//! repository revision and retried.
//!
mod kinds;
mod namespace;
mod commands;

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use kns_auth::{AuthContext, Authorization, Identity, PolicySource};
use kns_metadata::acl::AclResourceType;
use kns_metadata::core::{Resource, ResourceKey, Spec};
use kns_metadata::extended::{ResourceKind, SpecExt};
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::rolebinding::Verb;
use kns_store::{NameSpace, Precondition, ResourceRepository};

use crate::core::{Context, ResourceAction, SharedContext};
use crate::services::policy::RepositoryPolicy;
use crate::services::validation::{ValidateSpec, find_namespace, validate};
use crate::{Result, ScError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Created,
    Changed,
    Unchanged,
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome<S: Spec> {
    pub result: ApplyResult,
    pub resource: Resource<S>,
}

/// Kinds accepted by the pipeline
#[async_trait]
pub trait ApplySpec: ValidateSpec {
    /// status given to a created or changed resource until an executor reports
    fn accepted_status() -> Option<Self::Status> {
        None
    }

    /// restriction on overwriting or deleting a stored resource, on top of ownership
    fn modifiable(_identity: &Identity, _existing: &Resource<Self>) -> bool {
        true
    }

    /// remove the resource from its cluster, called before the stored record goes
    async fn delete_remote<R: ResourceRepository>(
        _ctx: &Context<R>,
        _resource: &Resource<Self>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Kinds an executor can report as unsynchronized
#[async_trait]
pub trait ImportSpec: ApplySpec {
    /// resources found on the cluster of the namespace and stored nowhere
    async fn unsynchronized<R: ResourceRepository>(
        ctx: &SharedContext<R>,
        namespace: &Resource<NamespaceSpec>,
    ) -> Result<Vec<Resource<Self>>>;
}

/// Compare a submitted resource with the stored one. Unchanged returns the
/// stored object, changed keeps the stored metadata.
pub fn diff<S: Spec>(
    submitted: Resource<S>,
    existing: Option<&Resource<S>>,
    accepted_status: Option<S::Status>,
) -> (ApplyResult, Resource<S>) {
    let Some(existing) = existing else {
        let mut created = submitted;
        created.metadata.creation_timestamp = Some(Utc::now());
        created.metadata.resource_version = 0;
        created.status = accepted_status;
        return (ApplyResult::Created, created);
    };

    if submitted.spec.same_desired(&existing.spec) {
        return (ApplyResult::Unchanged, existing.clone());
    }

    let mut changed = submitted;
    changed.metadata = changed.metadata.merge_onto(&existing.metadata);
    changed.status = accepted_status.or_else(|| existing.status.clone());
    (ApplyResult::Changed, changed)
}

/// Entry points of the control plane for a caller acting inside a namespace
#[derive(Debug)]
pub struct ApplyService<R, A> {
    ctx: SharedContext<R>,
    auth: A,
}

impl<R, A> ApplyService<R, A>
where
    R: ResourceRepository,
    A: Authorization,
{
    pub fn new(ctx: SharedContext<R>, auth: A) -> Self {
        Self { ctx, auth }
    }

    pub fn context(&self) -> &SharedContext<R> {
        &self.ctx
    }

    /// caller with the admin flag set from the configured admin group
    fn effective(&self, identity: &Identity) -> Identity {
        let admin_group = &self.ctx.config().admin_group;
        if admin_group.is_empty() {
            identity.clone()
        } else {
            identity.clone().with_admin_group(admin_group)
        }
    }

    async fn namespace(&self, name: &str) -> Result<Resource<NamespaceSpec>> {
        find_namespace(self.ctx.repo().as_ref(), name)
            .await?
            .ok_or_else(|| ScError::NotFound(format!("Namespace {name}")))
    }

    async fn authorize(
        &self,
        identity: &Identity,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        verb: Verb,
    ) -> Result<()> {
        if self
            .auth
            .authorize(identity, namespace, kind, name, verb)
            .await?
        {
            Ok(())
        } else {
            debug!(namespace, %kind, name, ?verb, "denied");
            Err(ScError::Authorization(format!(
                "Namespace {namespace} is not allowed to {verb:?} {kind} {name}"
            )))
        }
    }

    fn key<S: SpecExt>(namespace: &Resource<NamespaceSpec>, name: &str) -> ResourceKey {
        ResourceKey::new(namespace.cluster(), namespace.name(), S::KIND, name)
    }

    pub async fn get<S: SpecExt>(
        &self,
        identity: &Identity,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Resource<S>>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;
        self.authorize(&identity, namespace, S::KIND, name, Verb::Get)
            .await?;
        Ok(self.ctx.repo().get(&Self::key::<S>(&ns, name)).await?)
    }

    pub async fn list<S: SpecExt>(
        &self,
        identity: &Identity,
        namespace: &str,
    ) -> Result<Vec<Resource<S>>> {
        let identity = self.effective(identity);
        self.namespace(namespace).await?;
        self.authorize(&identity, namespace, S::KIND, "", Verb::Get)
            .await?;
        Ok(self
            .ctx
            .repo()
            .list(&NameSpace::from(namespace))
            .await?)
    }

    /// Diff and write under the key lock held by the caller. A conflict means
    /// an executor wrote the key since it was read: read again and diff again.
    async fn commit<S: SpecExt>(
        &self,
        key: &ResourceKey,
        submitted: Resource<S>,
        mut existing: Option<Resource<S>>,
        accepted_status: Option<S::Status>,
        dry_run: bool,
    ) -> Result<ApplyOutcome<S>> {
        let retries = self.ctx.config().executor.conflict_retries;
        let mut attempt = 0;
        loop {
            let (result, resource) =
                diff(submitted.clone(), existing.as_ref(), accepted_status.clone());
            if dry_run || result == ApplyResult::Unchanged {
                debug!(%key, %result, dry_run, "not persisted");
                return Ok(ApplyOutcome { result, resource });
            }

            let precondition = Precondition::from_existing(existing.as_ref());
            match self.ctx.repo().put(resource, precondition).await {
                Ok(stored) => {
                    info!(%key, %result, revision = stored.revision(), "applied");
                    self.ctx
                        .events()
                        .emit(ResourceAction::Applied, key.clone())
                        .await;
                    return Ok(ApplyOutcome {
                        result,
                        resource: stored,
                    });
                }
                Err(err) if err.is_conflict() && attempt < retries => {
                    attempt += 1;
                    warn!(%key, attempt, "concurrent write, retrying");
                    existing = self.ctx.repo().get(key).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// create or update a resource of the namespace
    #[instrument(skip_all, fields(namespace = %namespace, name = %resource.name()))]
    pub async fn apply<S: ApplySpec>(
        &self,
        identity: &Identity,
        namespace: &str,
        resource: Resource<S>,
        dry_run: bool,
    ) -> Result<ApplyOutcome<S>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;

        let mut submitted = resource.normalize();
        submitted.metadata.namespace = ns.name().to_owned();
        submitted.metadata.cluster = ns.cluster().to_owned();
        submitted.status = None;

        self.authorize(&identity, namespace, S::KIND, submitted.name(), Verb::Post)
            .await?;

        let key = submitted.key();
        let _guard = self.ctx.locks().lock(&key).await;

        let existing = self.ctx.repo().get::<S>(&key).await?;
        if let Some(stored) = &existing {
            if !S::modifiable(&identity, stored) {
                return Err(ScError::Authorization(format!(
                    "Namespace {namespace} is not allowed to modify {} {}",
                    S::LABEL,
                    stored.name()
                )));
            }
        }
        validate(&*self.ctx, &ns, &identity, &submitted, existing.as_ref()).await?;

        self.commit(&key, submitted, existing, S::accepted_status(), dry_run)
            .await
    }

    /// delete a stored resource, returns what was removed
    #[instrument(skip(self, identity))]
    pub async fn delete<S: ApplySpec>(
        &self,
        identity: &Identity,
        namespace: &str,
        name: &str,
        dry_run: bool,
    ) -> Result<Resource<S>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;
        self.authorize(&identity, namespace, S::KIND, name, Verb::Delete)
            .await?;

        let key = Self::key::<S>(&ns, name);
        let _guard = self.ctx.locks().lock(&key).await;

        let existing = self
            .ctx
            .repo()
            .get::<S>(&key)
            .await?
            .ok_or_else(|| ScError::NotFound(format!("{} {name}", S::LABEL)))?;
        if !S::modifiable(&identity, &existing) {
            return Err(ScError::Authorization(format!(
                "Namespace {namespace} is not allowed to delete {} {name}",
                S::LABEL
            )));
        }
        if dry_run {
            return Ok(existing);
        }

        S::delete_remote(&*self.ctx, &existing).await?;
        self.ctx.repo().delete::<S>(&key).await?;
        info!(%key, "deleted");
        self.ctx
            .events()
            .emit(ResourceAction::Deleted, key)
            .await;
        Ok(existing)
    }

    /// Store the unsynchronized resources of the cluster owned by the
    /// namespace. A second call finds nothing left to import.
    #[instrument(skip(self, identity))]
    pub async fn import<S: ImportSpec>(
        &self,
        identity: &Identity,
        namespace: &str,
        dry_run: bool,
    ) -> Result<Vec<Resource<S>>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;

        let auth_ctx = self.auth.create_auth_context(&identity, namespace).await?;
        if !auth_ctx.allow_type_action(S::KIND, Verb::Post).await? {
            return Err(ScError::Authorization(format!(
                "Namespace {namespace} is not allowed to import {}",
                S::LABEL
            )));
        }

        let owned = RepositoryPolicy::new(self.ctx.repo().clone())
            .owner_entries(namespace)
            .await?;
        let resource_type = AclResourceType::for_kind(S::KIND);
        let candidates: Vec<Resource<S>> = S::unsynchronized(&self.ctx, &ns)
            .await?
            .into_iter()
            .filter(|resource| {
                resource_type.is_some_and(|ty| {
                    owned
                        .iter()
                        .any(|ace| ace.grants_ownership(namespace, ty, resource.name()))
                })
            })
            .collect();

        let mut imported = Vec::with_capacity(candidates.len());
        for mut resource in candidates {
            resource.metadata.namespace = ns.name().to_owned();
            resource.metadata.cluster = ns.cluster().to_owned();
            if dry_run {
                imported.push(resource);
                continue;
            }

            let key = resource.key();
            let _guard = self.ctx.locks().lock(&key).await;
            match self.ctx.repo().put(resource, Precondition::Absent).await {
                Ok(stored) => {
                    info!(%key, "imported");
                    self.ctx
                        .events()
                        .emit(ResourceAction::Imported, key)
                        .await;
                    imported.push(stored);
                }
                Err(err) if err.is_conflict() => {
                    debug!(%key, "stored meanwhile, not imported");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(imported)
    }
}
