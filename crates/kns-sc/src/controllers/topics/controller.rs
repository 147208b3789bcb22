//!
//! # Topic executor
//!
//! Creates missing topics, applies config changes and partition increases.
//! Topics found only on the broker are reported, never deleted.
//!
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, instrument};

use kns_metadata::core::{ObjectMeta, Resource};
use kns_metadata::topic::{TopicPhase, TopicSpec, TopicStatus};
use kns_store::{NameSpace, ResourceRepository};

use crate::clients::{BrokerAdmin, TopicDescription, bounded};
use crate::controllers::{CycleReport, Executor, update_status};
use crate::core::SharedContext;
use crate::{RemoteError, Result};

use super::{TopicAction, plan_topics};

const TOPIC_CREATED: &str = "Topic created";
const TOPIC_UPDATED: &str = "Topic updated";

#[derive(Debug)]
pub struct TopicReconciler<R> {
    ctx: SharedContext<R>,
    cluster: String,
}

impl<R: ResourceRepository> TopicReconciler<R> {
    pub fn new(ctx: SharedContext<R>, cluster: impl Into<String>) -> Self {
        Self {
            ctx,
            cluster: cluster.into(),
        }
    }

    fn admin(&self) -> Result<Arc<dyn BrokerAdmin>, RemoteError> {
        self.ctx
            .cluster(&self.cluster)
            .ok_or_else(|| RemoteError::Unavailable(format!("cluster {}", self.cluster)))?
            .admin()
    }

    async fn desired(&self) -> Result<Vec<Resource<TopicSpec>>> {
        let topics = self.ctx.repo().list::<TopicSpec>(&NameSpace::All).await?;
        Ok(topics
            .into_iter()
            .filter(|topic| topic.cluster() == self.cluster)
            .collect())
    }

    async fn actual(&self) -> Result<Vec<TopicDescription>> {
        let admin = self.admin()?;
        Ok(bounded(self.ctx.remote_timeout(), admin.describe_topics()).await?)
    }

    /// topics of the broker without desired state, shaped as imported resources
    pub async fn unsynchronized(&self) -> Result<Vec<Resource<TopicSpec>>> {
        let actual = self.actual().await?;
        let plan = plan_topics(self.desired().await?, &actual);
        Ok(plan
            .unsynchronized
            .into_iter()
            .map(|topic| {
                let metadata = ObjectMeta {
                    name: topic.name.clone(),
                    cluster: self.cluster.clone(),
                    creation_timestamp: Some(Utc::now()),
                    ..Default::default()
                };
                Resource::new(metadata, topic.to_spec()).with_status(TopicStatus::imported())
            })
            .collect())
    }

    /// run the remote operations of one topic, first failure wins
    async fn apply(&self, admin: &dyn BrokerAdmin, action: &TopicAction) -> Result<(), RemoteError> {
        let timeout = self.ctx.remote_timeout();
        let name = action.resource.name();
        if action.create {
            info!(name, "creating topic");
            return bounded(timeout, admin.create_topic(name, &action.resource.spec, false)).await;
        }
        if let Some(configs) = &action.configs {
            info!(name, "altering topic configs");
            bounded(timeout, admin.alter_topic_config(name, configs, false)).await?;
        }
        if let Some(partitions) = action.partitions {
            info!(name, partitions, "increasing partitions");
            bounded(timeout, admin.create_partitions(name, partitions)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ResourceRepository> Executor for TopicReconciler<R> {
    fn name(&self) -> String {
        format!("{}-topic", self.cluster)
    }

    #[instrument(skip(self), fields(cluster = %self.cluster))]
    async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let read_only = self
            .ctx
            .cluster(&self.cluster)
            .map(|clients| clients.config().read_only)
            .unwrap_or(true);
        let admin = self.admin()?;

        let desired = self.desired().await?;
        let actual = self
            .actual()
            .await
            .with_context(|| format!("describing topics of {}", self.cluster))?;
        debug!(desired = desired.len(), actual = actual.len(), "topic cycle");

        let plan = plan_topics(desired, &actual);
        let mut report = CycleReport {
            planned_only: read_only,
            ..Default::default()
        };

        for topic in &plan.unsynchronized {
            info!(name = %topic.name, "unsynchronized topic");
            report.unsynchronized.push(topic.name.clone());
        }

        for action in plan.actions {
            let name = action.resource.name().to_owned();
            if read_only {
                if action.has_remote_change() || !action.refused.is_empty() {
                    info!(name, create = action.create, refused = ?action.refused, "read only, planned change");
                }
                continue;
            }

            let outcome = self.apply(admin.as_ref(), &action).await;
            let status = match (&outcome, action.refused.is_empty()) {
                (Err(err), _) => {
                    error!(name, "topic sync failed: {err}");
                    report.failed.push((name.clone(), err.to_string()));
                    TopicStatus::failed(err.message())
                }
                (Ok(()), false) => {
                    let message = action.refused.join(", ");
                    error!(name, "unsupported topic change: {message}");
                    report.failed.push((name.clone(), message.clone()));
                    TopicStatus::failed(message)
                }
                (Ok(()), true) if action.create => {
                    report.created.push(name.clone());
                    TopicStatus::success(TOPIC_CREATED)
                }
                (Ok(()), true) if action.has_remote_change() => {
                    report.updated.push(name.clone());
                    TopicStatus::success(TOPIC_UPDATED)
                }
                (Ok(()), true) => match &action.resource.status {
                    Some(current) if current.phase == TopicPhase::Success => current.clone(),
                    _ => TopicStatus::success(TOPIC_UPDATED),
                },
            };

            update_status(
                self.ctx.repo().as_ref(),
                &action.resource,
                status,
                TopicStatus::same_outcome,
            )
            .await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use kns_metadata::core::{ObjectMeta, Resource};
    use kns_metadata::topic::{TopicPhase, TopicSpec, TopicStatus};
    use kns_store::memory::MemoryRepository;
    use kns_store::{Precondition, ResourceRepository};

    use crate::clients::memory::MemoryBrokerAdmin;
    use crate::config::{ManagedClusterConfig, ScConfig};
    use crate::controllers::Executor;
    use crate::core::Context;
    use crate::RemoteError;

    use super::TopicReconciler;

    async fn setup(
        read_only: bool,
    ) -> (Arc<MemoryRepository>, Arc<MemoryBrokerAdmin>, TopicReconciler<MemoryRepository>) {
        let repo = MemoryRepository::new_shared();
        let admin = Arc::new(MemoryBrokerAdmin::new(3));
        let mut cluster = ManagedClusterConfig::managed("local");
        cluster.read_only = read_only;
        let config = ScConfig {
            managed_clusters: vec![cluster],
            ..Default::default()
        };
        let ctx = Context::builder(config, repo.clone())
            .broker_admin("local", admin.clone())
            .shared();
        (repo, admin, TopicReconciler::new(ctx, "local"))
    }

    async fn store(repo: &MemoryRepository, name: &str, spec: TopicSpec) -> Resource<TopicSpec> {
        let meta = ObjectMeta {
            name: name.to_owned(),
            namespace: "test".to_owned(),
            cluster: "local".to_owned(),
            ..Default::default()
        };
        repo.put(
            Resource::new(meta, spec).with_status(TopicStatus::pending()),
            Precondition::Absent,
        )
        .await
        .expect("store")
    }

    #[fluvio_future::test]
    async fn test_partitions_converge_and_never_decrease() {
        let (repo, admin, reconciler) = setup(false).await;
        admin.insert_topic("test.topic", TopicSpec::new(1, 3)).await;
        let stored = store(&repo, "test.topic", TopicSpec::new(3, 3)).await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.updated, vec!["test.topic"]);
        assert_eq!(admin.topic_description("test.topic").await.expect("topic").partitions, 3);

        // desired state now asks for fewer partitions
        let current = repo.get::<TopicSpec>(&stored.key()).await.expect("get").expect("topic");
        let mut fewer = current.clone();
        fewer.spec.partitions = 2;
        repo.put(fewer, Precondition::Revision(current.revision()))
            .await
            .expect("put");

        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(admin.topic_description("test.topic").await.expect("topic").partitions, 3);

        let status = repo
            .get::<TopicSpec>(&stored.key())
            .await
            .expect("get")
            .and_then(|t| t.status)
            .expect("status");
        assert_eq!(status.phase, TopicPhase::Failed);
        assert!(status.message.contains("not supported"));
    }

    #[fluvio_future::test]
    async fn test_failure_is_isolated() {
        let (repo, admin, reconciler) = setup(false).await;
        store(&repo, "test.bad", TopicSpec::new(3, 3)).await;
        let good = store(&repo, "test.good", TopicSpec::new(3, 3)).await;
        admin
            .fail_on("test.bad", RemoteError::broker("POLICY_VIOLATION", "rejected by policy"))
            .await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.created, vec!["test.good"]);
        assert_eq!(report.failed[0].0, "test.bad");

        let good = repo.get::<TopicSpec>(&good.key()).await.expect("get").expect("topic");
        assert_eq!(good.status.expect("status").phase, TopicPhase::Success);

        // retried on the next cycle
        admin.clear_failures().await;
        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.created, vec!["test.bad"]);
    }

    #[fluvio_future::test]
    async fn test_unsynchronized_never_deleted() {
        let (_repo, admin, reconciler) = setup(false).await;
        admin.insert_topic("legacy.topic", TopicSpec::new(1, 1)).await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.unsynchronized, vec!["legacy.topic"]);
        assert!(admin.topic_description("legacy.topic").await.is_some());
        assert_eq!(admin.writes(), 0);

        let imported = reconciler.unsynchronized().await.expect("unsynchronized");
        assert_eq!(imported.len(), 1);
        assert_eq!(
            imported[0].status.as_ref().expect("status").message,
            "Imported from cluster"
        );
    }

    #[fluvio_future::test]
    async fn test_read_only_cluster_is_not_written() {
        let (repo, admin, reconciler) = setup(true).await;
        store(&repo, "test.topic", TopicSpec::new(3, 3)).await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert!(report.planned_only);
        assert_eq!(admin.writes(), 0);
        assert!(admin.topic_description("test.topic").await.is_none());
    }
}
