use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use kns_auth::{Authorization, Identity};
use kns_metadata::command::{
    ChangeConnectorStateSpec, ChangeConnectorStateStatus, ConnectorAction, DeleteRecordsSpec,
    DeleteRecordsStatus,
};
use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::{ObjectMeta, Resource};
use kns_metadata::extended::ResourceKind;
use kns_metadata::rolebinding::Verb;
use kns_metadata::topic::TopicSpec;
use kns_store::ResourceRepository;
use kns_types::{Offset, PartitionId};

use crate::clients::bounded;
use crate::{RemoteError, Result, ScError};

use super::ApplyService;

fn low_water_marks(topic: &str, offsets: BTreeMap<PartitionId, Offset>) -> BTreeMap<String, Offset> {
    offsets
        .into_iter()
        .map(|(partition, offset)| (format!("{topic}-{partition}"), offset))
        .collect()
}

impl<R, A> ApplyService<R, A>
where
    R: ResourceRepository,
    A: Authorization,
{
    fn command_meta(namespace: &str, cluster: &str, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            cluster: cluster.to_owned(),
            ..Default::default()
        }
    }

    /// Empty every partition of a topic up to its latest offset.
    /// A dry run reports the offsets that would become the low water marks.
    #[instrument(skip(self, identity))]
    pub async fn delete_records(
        &self,
        identity: &Identity,
        namespace: &str,
        topic: &str,
        dry_run: bool,
    ) -> Result<Resource<DeleteRecordsSpec>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;
        self.authorize(&identity, namespace, ResourceKind::DeleteRecords, topic, Verb::Post)
            .await?;

        let stored = self
            .ctx
            .repo()
            .get::<TopicSpec>(&Self::key::<TopicSpec>(&ns, topic))
            .await?
            .ok_or_else(|| ScError::NotFound(format!("Topic {topic}")))?;
        if stored.spec.is_compacted() {
            return Err(ScError::Validation(vec![format!(
                "Invalid value {topic} for name: Cannot delete records on a compacted topic. Please delete and recreate the topic."
            )]));
        }

        let clients = self
            .ctx
            .cluster(ns.cluster())
            .ok_or_else(|| RemoteError::Unavailable(format!("cluster {}", ns.cluster())))?;
        let admin = clients.admin()?;
        let timeout = self.ctx.remote_timeout();

        let offsets = bounded(timeout, admin.list_offsets(topic)).await?;
        let marks = if dry_run {
            offsets
        } else {
            let marks = bounded(timeout, admin.delete_records(topic, &offsets)).await?;
            info!(topic, partitions = marks.len(), "records deleted");
            marks
        };

        let status = DeleteRecordsStatus {
            success: true,
            low_water_marks: low_water_marks(topic, marks),
        };
        Ok(Resource::new(
            Self::command_meta(namespace, ns.cluster(), topic),
            DeleteRecordsSpec {},
        )
        .with_status(status))
    }

    /// Restart, pause or resume a connector. Rejections by the connect runtime
    /// are reported in the status, unreachable runtimes fail the request.
    #[instrument(skip(self, identity))]
    pub async fn change_connector_state(
        &self,
        identity: &Identity,
        namespace: &str,
        name: &str,
        action: ConnectorAction,
    ) -> Result<Resource<ChangeConnectorStateSpec>> {
        let identity = self.effective(identity);
        let ns = self.namespace(namespace).await?;
        self.authorize(
            &identity,
            namespace,
            ResourceKind::ChangeConnectorState,
            name,
            Verb::Post,
        )
        .await?;

        let connector = self
            .ctx
            .repo()
            .get::<ConnectorSpec>(&Self::key::<ConnectorSpec>(&ns, name))
            .await?
            .ok_or_else(|| ScError::NotFound(format!("Connector {name}")))?;
        let connect_cluster = &connector.spec.connect_cluster;
        let client = self
            .ctx
            .cluster(ns.cluster())
            .and_then(|clients| clients.connect(connect_cluster))
            .ok_or_else(|| RemoteError::Unavailable(format!("connect cluster {connect_cluster}")))?;

        let status = match bounded(self.ctx.remote_timeout(), client.change_state(name, action)).await
        {
            Ok(code) => {
                info!(name, %action, code, "connector state changed");
                ChangeConnectorStateStatus {
                    success: true,
                    code,
                    error_message: None,
                }
            }
            Err(RemoteError::Http { status, message }) => {
                warn!(name, %action, status, "connector state change rejected");
                ChangeConnectorStateStatus {
                    success: false,
                    code: status,
                    error_message: Some(message),
                }
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Resource::new(
            Self::command_meta(namespace, ns.cluster(), name),
            ChangeConnectorStateSpec { action },
        )
        .with_status(status))
    }
}
