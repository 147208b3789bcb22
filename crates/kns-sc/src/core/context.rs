//!
//! # Control plane context
//!
//! Repository, configuration and remote clients shared by the apply pipeline
//! and the executors.
//!
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use kns_store::{KeyLocks, ResourceRepository};
use kns_types::event::StickyEvent;

use crate::clients::{BrokerAdmin, ConnectClient, HttpConnectClient};
use crate::config::{ManagedClusterConfig, ScConfig};
use crate::{RemoteError, Result};

use super::{ExecutorRegistry, ResourceEvents};

pub type SharedContext<R> = Arc<Context<R>>;

/// remote clients of one managed cluster
#[derive(Debug, Clone)]
pub struct ClusterClients {
    config: ManagedClusterConfig,
    admin: Option<Arc<dyn BrokerAdmin>>,
    connects: HashMap<String, Arc<dyn ConnectClient>>,
}

impl ClusterClients {
    pub fn config(&self) -> &ManagedClusterConfig {
        &self.config
    }

    pub fn admin(&self) -> Result<Arc<dyn BrokerAdmin>, RemoteError> {
        self.admin
            .clone()
            .ok_or_else(|| RemoteError::Unavailable(format!("broker of cluster {}", self.config.name)))
    }

    pub fn has_admin(&self) -> bool {
        self.admin.is_some()
    }

    pub fn connect(&self, name: &str) -> Option<Arc<dyn ConnectClient>> {
        self.connects.get(name).cloned()
    }

    pub fn connects(&self) -> impl Iterator<Item = (&String, &Arc<dyn ConnectClient>)> {
        self.connects.iter()
    }
}

#[derive(Debug)]
pub struct Context<R> {
    repo: Arc<R>,
    config: ScConfig,
    clusters: HashMap<String, ClusterClients>,
    locks: KeyLocks,
    events: ResourceEvents,
    executors: ExecutorRegistry,
    shutdown: Arc<StickyEvent>,
}

impl<R: ResourceRepository> Context<R> {
    pub fn builder(config: ScConfig, repo: Arc<R>) -> ContextBuilder<R> {
        ContextBuilder {
            repo,
            config,
            admins: HashMap::new(),
            connects: HashMap::new(),
        }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn config(&self) -> &ScConfig {
        &self.config
    }

    pub fn remote_timeout(&self) -> Duration {
        self.config.executor.remote_timeout
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterClients> {
        self.clusters.get(name)
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    pub fn events(&self) -> &ResourceEvents {
        &self.events
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.executors
    }

    pub fn shutdown_event(&self) -> Arc<StickyEvent> {
        self.shutdown.clone()
    }

    /// stop every executor after its current cycle
    pub fn shutdown(&self) {
        info!("shutting down executors");
        self.shutdown.notify();
    }
}

/// Assembles a context. Connect clusters configured with an url get an http
/// client unless one was registered explicitly.
#[derive(Debug)]
pub struct ContextBuilder<R> {
    repo: Arc<R>,
    config: ScConfig,
    admins: HashMap<String, Arc<dyn BrokerAdmin>>,
    connects: HashMap<(String, String), Arc<dyn ConnectClient>>,
}

impl<R: ResourceRepository> ContextBuilder<R> {
    pub fn broker_admin(mut self, cluster: &str, admin: Arc<dyn BrokerAdmin>) -> Self {
        self.admins.insert(cluster.to_owned(), admin);
        self
    }

    pub fn connect_client(
        mut self,
        cluster: &str,
        connect_cluster: &str,
        client: Arc<dyn ConnectClient>,
    ) -> Self {
        self.connects
            .insert((cluster.to_owned(), connect_cluster.to_owned()), client);
        self
    }

    pub fn build(mut self) -> Context<R> {
        let timeout = self.config.executor.remote_timeout;
        let mut clusters = HashMap::new();

        for cluster in &self.config.managed_clusters {
            let mut connects = HashMap::new();
            for (name, connect_config) in &cluster.connects {
                let key = (cluster.name.clone(), name.clone());
                if let Some(client) = self.connects.remove(&key) {
                    connects.insert(name.clone(), client);
                    continue;
                }
                match HttpConnectClient::new(connect_config, timeout) {
                    Ok(client) => {
                        let client: Arc<dyn ConnectClient> = Arc::new(client);
                        connects.insert(name.clone(), client);
                    }
                    Err(err) => {
                        warn!(cluster = %cluster.name, connect = %name, "unusable connect cluster: {err}");
                    }
                }
            }

            let admin = self.admins.remove(&cluster.name);
            if admin.is_none() {
                debug!(cluster = %cluster.name, "no broker admin registered");
            }
            clusters.insert(
                cluster.name.clone(),
                ClusterClients {
                    config: cluster.clone(),
                    admin,
                    connects,
                },
            );
        }

        Context {
            repo: self.repo,
            config: self.config,
            clusters,
            locks: KeyLocks::default(),
            events: ResourceEvents::default(),
            executors: ExecutorRegistry::default(),
            shutdown: StickyEvent::shared(),
        }
    }

    pub fn shared(self) -> SharedContext<R> {
        Arc::new(self.build())
    }
}
