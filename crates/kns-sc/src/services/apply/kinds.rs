use async_trait::async_trait;
use tracing::{debug, info};

use kns_auth::Identity;
use kns_metadata::acl::{AccessControlEntrySpec, Permission};
use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::Resource;
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::rolebinding::RoleBindingSpec;
use kns_metadata::topic::{TopicSpec, TopicStatus};
use kns_store::ResourceRepository;

use crate::clients::bounded;
use crate::config::ManagedClusterConfig;
use crate::controllers::connectors::ConnectorReconciler;
use crate::controllers::topics::TopicReconciler;
use crate::core::{ClusterClients, Context, SharedContext};
use crate::{RemoteError, Result};

use super::{ApplySpec, ImportSpec};

const UNKNOWN_TOPIC: &str = "UNKNOWN_TOPIC_OR_PARTITION";
const NOT_FOUND: u16 = 404;

/// managed cluster allowing writes for a kind, if any
fn writable<'a, R: ResourceRepository>(
    ctx: &'a Context<R>,
    cluster: &str,
    manages: impl Fn(&ManagedClusterConfig) -> bool,
) -> Option<&'a ClusterClients> {
    ctx.cluster(cluster)
        .filter(|clients| manages(clients.config()) && !clients.config().read_only)
}

#[async_trait]
impl ApplySpec for TopicSpec {
    fn accepted_status() -> Option<TopicStatus> {
        Some(TopicStatus::pending())
    }

    async fn delete_remote<R: ResourceRepository>(
        ctx: &Context<R>,
        resource: &Resource<Self>,
    ) -> Result<()> {
        let Some(clients) = writable(ctx, resource.cluster(), |c| c.manage_topics) else {
            debug!(name = %resource.name(), "cluster not writable, stored record only");
            return Ok(());
        };
        let admin = clients.admin()?;
        match bounded(ctx.remote_timeout(), admin.delete_topic(resource.name())).await {
            Ok(()) => {
                info!(name = %resource.name(), "topic deleted from cluster");
                Ok(())
            }
            Err(RemoteError::Broker { code, .. }) if code == UNKNOWN_TOPIC => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ImportSpec for TopicSpec {
    async fn unsynchronized<R: ResourceRepository>(
        ctx: &SharedContext<R>,
        namespace: &Resource<NamespaceSpec>,
    ) -> Result<Vec<Resource<Self>>> {
        TopicReconciler::new(ctx.clone(), namespace.cluster())
            .unsynchronized()
            .await
    }
}

#[async_trait]
impl ApplySpec for ConnectorSpec {
    async fn delete_remote<R: ResourceRepository>(
        ctx: &Context<R>,
        resource: &Resource<Self>,
    ) -> Result<()> {
        let Some(clients) = writable(ctx, resource.cluster(), |c| c.manage_connectors) else {
            debug!(name = %resource.name(), "cluster not writable, stored record only");
            return Ok(());
        };
        let client = clients.connect(&resource.spec.connect_cluster).ok_or_else(|| {
            RemoteError::Unavailable(format!("connect cluster {}", resource.spec.connect_cluster))
        })?;
        match bounded(ctx.remote_timeout(), client.delete_connector(resource.name())).await {
            Ok(()) => {
                info!(name = %resource.name(), "connector deleted from connect cluster");
                Ok(())
            }
            Err(RemoteError::Http { status, .. }) if status == NOT_FOUND => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ImportSpec for ConnectorSpec {
    async fn unsynchronized<R: ResourceRepository>(
        ctx: &SharedContext<R>,
        namespace: &Resource<NamespaceSpec>,
    ) -> Result<Vec<Resource<Self>>> {
        let connectors = ConnectorReconciler::new(ctx.clone(), namespace.cluster())
            .unsynchronized()
            .await?;
        Ok(connectors
            .into_iter()
            .filter(|connector| namespace.spec.can_reach(&connector.spec.connect_cluster))
            .collect())
    }
}

#[async_trait]
impl ApplySpec for AccessControlEntrySpec {
    /// ownership is handed out and taken back by admins only
    fn modifiable(identity: &Identity, existing: &Resource<Self>) -> bool {
        identity.admin || existing.spec.permission != Permission::Owner
    }
}

#[async_trait]
impl ApplySpec for RoleBindingSpec {}
