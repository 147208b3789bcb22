//!
//! # Connector executor
//!
//! Deploys desired connectors on every connect cluster of a managed cluster
//! and mirrors the runtime state into the connector status.
//!
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use kns_metadata::connector::{CONNECTOR_NAME_KEY, ConnectorSpec, ConnectorStatus};
use kns_metadata::core::{ObjectMeta, Resource};
use kns_store::{NameSpace, ResourceRepository};

use crate::clients::{ConnectClient, ConnectorInfo, bounded};
use crate::controllers::{CycleReport, Executor, update_status};
use crate::core::SharedContext;
use crate::{RemoteError, Result};

use super::plan_connectors;

#[derive(Debug, Default)]
struct Observed {
    infos: Vec<ConnectorInfo>,
    unreadable: Vec<(String, RemoteError)>,
}

#[derive(Debug)]
pub struct ConnectorReconciler<R> {
    ctx: SharedContext<R>,
    cluster: String,
}

impl<R: ResourceRepository> ConnectorReconciler<R> {
    pub fn new(ctx: SharedContext<R>, cluster: impl Into<String>) -> Self {
        Self {
            ctx,
            cluster: cluster.into(),
        }
    }

    fn connect_clusters(&self) -> Vec<(String, Arc<dyn ConnectClient>)> {
        self.ctx
            .cluster(&self.cluster)
            .map(|clients| {
                clients
                    .connects()
                    .map(|(name, client)| (name.clone(), client.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn desired(&self, connect_cluster: &str) -> Result<Vec<Resource<ConnectorSpec>>> {
        let connectors = self.ctx.repo().list::<ConnectorSpec>(&NameSpace::All).await?;
        Ok(connectors
            .into_iter()
            .filter(|c| c.cluster() == self.cluster && c.spec.connect_cluster == connect_cluster)
            .collect())
    }

    /// Connectors running on the runtime. A connector that cannot be read is
    /// returned apart, the listing itself failing is the only error.
    async fn actual(&self, client: &dyn ConnectClient) -> Result<Observed, RemoteError> {
        let timeout = self.ctx.remote_timeout();
        let names = bounded(timeout, client.list_connectors()).await?;
        let results = join_all(
            names
                .iter()
                .map(|name| bounded(timeout, client.connector(name))),
        )
        .await;

        let mut observed = Observed::default();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(Some(info)) => observed.infos.push(info),
                // deleted since listed
                Ok(None) => {}
                Err(err) => {
                    warn!(name, "unable to read connector: {err}");
                    observed.unreadable.push((name, err));
                }
            }
        }
        Ok(observed)
    }

    /// connectors of the runtimes without desired state, shaped as imported resources
    pub async fn unsynchronized(&self) -> Result<Vec<Resource<ConnectorSpec>>> {
        let mut imported = vec![];
        for (connect_cluster, client) in self.connect_clusters() {
            let observed = self.actual(client.as_ref()).await?;
            let plan = plan_connectors(self.desired(&connect_cluster).await?, observed.infos);
            for info in plan.unsynchronized {
                let mut spec = ConnectorSpec::new(&connect_cluster);
                spec.config = info.config.clone();
                spec.config.remove(CONNECTOR_NAME_KEY);
                let metadata = ObjectMeta {
                    name: info.name.clone(),
                    cluster: self.cluster.clone(),
                    creation_timestamp: Some(Utc::now()),
                    ..Default::default()
                };
                imported.push(
                    Resource::new(metadata, spec).with_status(ConnectorStatus::imported(info.status)),
                );
            }
        }
        Ok(imported)
    }

    async fn deploy(
        &self,
        client: &dyn ConnectClient,
        resource: &Resource<ConnectorSpec>,
    ) -> Result<ConnectorStatus, RemoteError> {
        let timeout = self.ctx.remote_timeout();
        let name = resource.name();
        info!(name, connect = %resource.spec.connect_cluster, "deploying connector");
        bounded(timeout, client.put_connector(name, &resource.spec.config)).await?;
        let status = bounded(timeout, client.connector(name))
            .await?
            .map(|info| info.status)
            .unwrap_or_default();
        Ok(ConnectorStatus {
            last_update: Some(Utc::now()),
            ..status
        })
    }

    async fn sync_connect_cluster(
        &self,
        connect_cluster: &str,
        client: &dyn ConnectClient,
        read_only: bool,
        report: &mut CycleReport,
    ) -> Result<()> {
        let observed = match self.actual(client).await {
            Ok(observed) => observed,
            Err(err) => {
                error!(connect = connect_cluster, "unable to list connectors: {err}");
                report
                    .failed
                    .push((format!("connect cluster {connect_cluster}"), err.to_string()));
                return Ok(());
            }
        };
        let mut unreadable = HashSet::new();
        for (name, err) in observed.unreadable {
            report.failed.push((name.clone(), err.to_string()));
            unreadable.insert(name);
        }
        // unreadable connectors are left as they are until the next cycle
        let desired: Vec<_> = self
            .desired(connect_cluster)
            .await?
            .into_iter()
            .filter(|resource| !unreadable.contains(resource.name()))
            .collect();
        let deployed: HashSet<String> = observed.infos.iter().map(|info| info.name.clone()).collect();
        let plan = plan_connectors(desired, observed.infos);
        debug!(
            connect = connect_cluster,
            deploy = plan.deploy.len(),
            in_sync = plan.in_sync.len(),
            "connector plan"
        );

        for info in &plan.unsynchronized {
            info!(name = %info.name, connect = connect_cluster, "unsynchronized connector");
            report.unsynchronized.push(info.name.clone());
        }

        if read_only {
            for resource in &plan.deploy {
                info!(name = %resource.name(), "read only, planned deployment");
            }
            return Ok(());
        }

        for resource in plan.deploy {
            let name = resource.name().to_owned();
            let status = match self.deploy(client, &resource).await {
                Ok(status) => {
                    if deployed.contains(&name) {
                        report.updated.push(name);
                    } else {
                        report.created.push(name);
                    }
                    status
                }
                Err(err) => {
                    error!(name, "connector deployment failed: {err}");
                    report.failed.push((name, err.to_string()));
                    ConnectorStatus::failed(err.message())
                }
            };
            update_status(
                self.ctx.repo().as_ref(),
                &resource,
                status,
                ConnectorStatus::same_outcome,
            )
            .await?;
        }

        for (resource, info) in plan.in_sync {
            let status = ConnectorStatus {
                last_update: Some(Utc::now()),
                ..info.status
            };
            update_status(
                self.ctx.repo().as_ref(),
                &resource,
                status,
                ConnectorStatus::same_outcome,
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ResourceRepository> Executor for ConnectorReconciler<R> {
    fn name(&self) -> String {
        format!("{}-connector", self.cluster)
    }

    #[instrument(skip(self), fields(cluster = %self.cluster))]
    async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let read_only = self
            .ctx
            .cluster(&self.cluster)
            .map(|clients| clients.config().read_only)
            .unwrap_or(true);
        let mut report = CycleReport {
            planned_only: read_only,
            ..Default::default()
        };

        let connect_clusters = self.connect_clusters();
        if connect_clusters.is_empty() {
            warn!("no connect cluster configured");
        }
        for (connect_cluster, client) in connect_clusters {
            self.sync_connect_cluster(&connect_cluster, client.as_ref(), read_only, &mut report)
                .await?;
        }
        Ok(report)
    }
}
