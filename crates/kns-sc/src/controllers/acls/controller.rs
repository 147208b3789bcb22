//!
//! # ACL executor
//!
//! Creates the broker bindings derived from access control entries.
//! Bindings held by managed principals without a matching entry are
//! reported only.
//!
use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use kns_metadata::acl::AccessControlEntrySpec;
use kns_metadata::core::Resource;
use kns_metadata::namespace::NamespaceSpec;
use kns_store::{NameSpace, ResourceRepository};

use crate::clients::{BrokerAdmin, bounded};
use crate::controllers::{CycleReport, Executor};
use crate::core::SharedContext;
use crate::{RemoteError, Result};

use super::{desired_bindings, plan_acls, principal};

#[derive(Debug)]
pub struct AclReconciler<R> {
    ctx: SharedContext<R>,
    cluster: String,
}

impl<R: ResourceRepository> AclReconciler<R> {
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

    async fn namespaces(&self) -> Result<Vec<Resource<NamespaceSpec>>> {
        let namespaces = self.ctx.repo().list::<NamespaceSpec>(&NameSpace::All).await?;
        Ok(namespaces
            .into_iter()
            .filter(|ns| ns.cluster() == self.cluster)
            .collect())
    }

    async fn entries(&self) -> Result<Vec<Resource<AccessControlEntrySpec>>> {
        let aces = self
            .ctx
            .repo()
            .list::<AccessControlEntrySpec>(&NameSpace::All)
            .await?;
        Ok(aces
            .into_iter()
            .filter(|ace| ace.cluster() == self.cluster)
            .collect())
    }
}

#[async_trait]
impl<R: ResourceRepository> Executor for AclReconciler<R> {
    fn name(&self) -> String {
        format!("{}-acl", self.cluster)
    }

    #[instrument(skip(self), fields(cluster = %self.cluster))]
    async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let read_only = self
            .ctx
            .cluster(&self.cluster)
            .map(|clients| clients.config().read_only)
            .unwrap_or(true);
        let admin = self.admin()?;
        let timeout = self.ctx.remote_timeout();

        let namespaces = self.namespaces().await?;
        let desired = desired_bindings(&namespaces, &self.entries().await?);
        let managed: BTreeSet<String> = namespaces
            .iter()
            .filter(|ns| !ns.spec.kafka_user.is_empty())
            .map(|ns| principal(&ns.spec.kafka_user))
            .collect();
        let actual = bounded(timeout, admin.describe_acls())
            .await
            .with_context(|| format!("describing acls of {}", self.cluster))?;
        debug!(desired = desired.len(), actual = actual.len(), "acl cycle");

        let plan = plan_acls(&desired, &actual, &managed);
        let mut report = CycleReport {
            planned_only: read_only,
            ..Default::default()
        };

        for binding in &plan.unsynchronized {
            info!(%binding, "unsynchronized acl");
            report.unsynchronized.push(binding.to_string());
        }

        for binding in plan.missing {
            if read_only {
                info!(%binding, "read only, planned acl");
                continue;
            }
            match bounded(timeout, admin.create_acls(std::slice::from_ref(&binding))).await {
                Ok(()) => {
                    info!(%binding, "acl created");
                    report.created.push(binding.to_string());
                }
                Err(err) => {
                    error!(%binding, "acl creation failed: {err}");
                    report.failed.push((binding.to_string(), err.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, ResourcePatternType};
    use kns_metadata::core::{ObjectMeta, Resource};
    use kns_metadata::namespace::NamespaceSpec;
    use kns_store::memory::MemoryRepository;
    use kns_store::{Precondition, ResourceRepository};

    use crate::RemoteError;
    use crate::clients::memory::MemoryBrokerAdmin;
    use crate::config::{ManagedClusterConfig, ScConfig};
    use crate::controllers::Executor;
    use crate::core::Context;

    use super::AclReconciler;

    fn meta(name: &str, namespace: &str) -> ObjectMeta {
        ObjectMeta {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            cluster: "local".to_owned(),
            ..Default::default()
        }
    }

    async fn setup(read_only: bool) -> (Arc<MemoryRepository>, Arc<MemoryBrokerAdmin>, AclReconciler<MemoryRepository>) {
        let repo = MemoryRepository::new_shared();
        let admin = Arc::new(MemoryBrokerAdmin::new(3));
        let config = ScConfig {
            managed_clusters: vec![ManagedClusterConfig {
                read_only,
                ..ManagedClusterConfig::managed("local")
            }],
            ..Default::default()
        };
        let ctx = Context::builder(config, repo.clone())
            .broker_admin("local", admin.clone())
            .shared();

        repo.put(
            Resource::new(
                meta("test", "test"),
                NamespaceSpec {
                    kafka_user: "u_test".to_owned(),
                    ..Default::default()
                },
            ),
            Precondition::Absent,
        )
        .await
        .expect("namespace");
        repo.put(
            Resource::new(
                meta("test-topics", "test"),
                AccessControlEntrySpec::owner(
                    AclResourceType::Topic,
                    "test.",
                    ResourcePatternType::Prefixed,
                    "test",
                ),
            ),
            Precondition::Absent,
        )
        .await
        .expect("ace");

        (repo, admin, AclReconciler::new(ctx, "local"))
    }

    #[fluvio_future::test]
    async fn test_missing_bindings_created_once() {
        let (_repo, admin, reconciler) = setup(false).await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert_eq!(report.created.len(), 3);
        assert_eq!(admin.acls().await.len(), 3);
        assert_eq!(admin.writes(), 3);

        let report = reconciler.run_cycle().await.expect("cycle");
        assert!(report.created.is_empty());
        assert_eq!(admin.writes(), 3);
    }

    #[fluvio_future::test]
    async fn test_read_only_plans() {
        let (_repo, admin, reconciler) = setup(true).await;

        let report = reconciler.run_cycle().await.expect("cycle");
        assert!(report.planned_only);
        assert!(report.created.is_empty());
        assert_eq!(admin.writes(), 0);
    }

    #[fluvio_future::test]
    async fn test_unreachable_broker_fails_cycle() {
        let (_repo, admin, reconciler) = setup(false).await;
        admin
            .fail_on("", RemoteError::Transport("connection refused".to_owned()))
            .await;

        assert!(reconciler.run_cycle().await.is_err());
        assert_eq!(admin.writes(), 0);
    }
}
