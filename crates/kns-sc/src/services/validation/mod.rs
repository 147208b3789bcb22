//!
//! # Validation engine
//!
//! Local checks run against the namespace configuration. Remote checks ask
//! the target cluster and only run when the local ones passed. Broker and
//! connect rejections become validation errors, an unreachable remote aborts
//! the request.
//!
mod topic;
mod connector;
mod acl;
mod rolebinding;
mod namespace;

pub use namespace::{find_namespace, validate_namespace};

use async_trait::async_trait;
use tracing::debug;

use kns_auth::Identity;
use kns_metadata::core::Resource;
use kns_metadata::extended::SpecExt;
use kns_metadata::namespace::NamespaceSpec;
use kns_store::ResourceRepository;

use crate::core::Context;
use crate::{RemoteError, Result, ScError};

#[async_trait]
pub trait ValidateSpec: SpecExt {
    async fn validate_local<R: ResourceRepository>(
        ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        identity: &Identity,
        resource: &Resource<Self>,
    ) -> Result<Vec<String>>;

    async fn validate_remote<R: ResourceRepository>(
        _ctx: &Context<R>,
        _namespace: &Resource<NamespaceSpec>,
        _resource: &Resource<Self>,
        _existing: Option<&Resource<Self>>,
    ) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

/// every error of the failing phase, local errors skip the remote phase
pub async fn validate<S, R>(
    ctx: &Context<R>,
    namespace: &Resource<NamespaceSpec>,
    identity: &Identity,
    resource: &Resource<S>,
    existing: Option<&Resource<S>>,
) -> Result<()>
where
    S: ValidateSpec,
    R: ResourceRepository,
{
    let errors = S::validate_local(ctx, namespace, identity, resource).await?;
    if !errors.is_empty() {
        debug!(kind = S::LABEL, name = %resource.name(), count = errors.len(), "local validation failed");
        return Err(ScError::Validation(errors));
    }

    let errors = S::validate_remote(ctx, namespace, resource, existing).await?;
    if !errors.is_empty() {
        debug!(kind = S::LABEL, name = %resource.name(), count = errors.len(), "remote validation failed");
        return Err(ScError::Validation(errors));
    }
    Ok(())
}

/// rejections are reported as errors, anything else aborts
fn rejected(result: Result<(), RemoteError>) -> Result<Vec<String>> {
    match result {
        Ok(()) => Ok(vec![]),
        Err(err) if err.is_rejection() => Ok(vec![err.message()]),
        Err(err) => Err(err.into()),
    }
}
