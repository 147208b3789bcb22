//!
//! # Control plane configuration
//!
//! Loaded from TOML, see [`SaveLoadConfig`](kns_types::config_file::SaveLoadConfig).
//!
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Serialize, Deserialize};

use kns_types::ClusterName;
use kns_types::defaults::{CONFLICT_RETRIES, EXECUTOR_INTERVAL, EXECUTOR_REMOTE_TIMEOUT};

macro_rules! whitelist {
    ($config:expr,$name:expr,$start:expr) => {
        if $config.enabled($name) {
            $start;
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScConfig {
    /// members of this group act as administrators
    pub admin_group: String,
    /// executors to start, all of them when empty
    pub white_list: BTreeSet<String>,
    pub executor: ExecutorConfig,
    pub managed_clusters: Vec<ManagedClusterConfig>,
}

impl ScConfig {
    pub fn enabled(&self, name: &str) -> bool {
        self.white_list.is_empty() || self.white_list.contains(name)
    }

    pub fn cluster(&self, name: &str) -> Option<&ManagedClusterConfig> {
        self.managed_clusters.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// upper bound of any single broker or connect call
    #[serde(with = "humantime_serde")]
    pub remote_timeout: Duration,
    pub conflict_retries: u16,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interval: EXECUTOR_INTERVAL,
            remote_timeout: EXECUTOR_REMOTE_TIMEOUT,
            conflict_retries: CONFLICT_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterProvider {
    #[default]
    SelfManaged,
    ConfluentCloud,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedClusterConfig {
    pub name: ClusterName,
    pub manage_topics: bool,
    pub manage_acls: bool,
    pub manage_connectors: bool,
    /// plan and log, never write to the cluster
    pub read_only: bool,
    pub provider: ClusterProvider,
    /// admin client properties
    pub config: BTreeMap<String, String>,
    pub connects: BTreeMap<String, ConnectConfig>,
}

impl Default for ManagedClusterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            manage_topics: false,
            manage_acls: false,
            manage_connectors: false,
            read_only: true,
            provider: ClusterProvider::default(),
            config: BTreeMap::new(),
            connects: BTreeMap::new(),
        }
    }
}

impl ManagedClusterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// manage every kind and write to the cluster
    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manage_topics: true,
            manage_acls: true,
            manage_connectors: true,
            read_only: false,
            ..Default::default()
        }
    }

    pub fn with_connect(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.connects.insert(
            name.into(),
            ConnectConfig {
                url: url.into(),
                ..Default::default()
            },
        );
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth_password: Option<String>,
}
