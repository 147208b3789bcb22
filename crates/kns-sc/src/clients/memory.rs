//!
//! # In memory remotes
//!
//! Broker and connect runtime kept in process. They apply the same rules the
//! real remotes enforce for the operations the control plane issues.
//!
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_lock::RwLock;
use async_trait::async_trait;
use tracing::debug;

use fluvio_future::timer::sleep;

use kns_metadata::command::ConnectorAction;
use kns_metadata::connector::{ConnectorState, ConnectorStatus, TaskStatus};
use kns_metadata::topic::TopicSpec;
use kns_metadata::validator::invalid_value;
use kns_types::defaults::CONNECTOR_CLASS_KEY;
use kns_types::{Offset, PartitionCount, PartitionId};

use crate::RemoteError;
use super::{AclBinding, BrokerAdmin, ConnectClient, ConnectorInfo, TopicDescription};

#[derive(Debug, Clone)]
struct MemoryTopic {
    description: TopicDescription,
    /// (low water mark, latest offset) per partition
    offsets: BTreeMap<PartitionId, (Offset, Offset)>,
}

#[derive(Debug)]
pub struct MemoryBrokerAdmin {
    broker_count: i32,
    topics: RwLock<BTreeMap<String, MemoryTopic>>,
    acls: RwLock<BTreeSet<AclBinding>>,
    failures: RwLock<HashMap<String, RemoteError>>,
    delay: RwLock<Option<Duration>>,
    writes: AtomicUsize,
}

impl MemoryBrokerAdmin {
    pub fn new(broker_count: i32) -> Self {
        Self {
            broker_count,
            topics: RwLock::new(BTreeMap::new()),
            acls: RwLock::new(BTreeSet::new()),
            failures: RwLock::new(HashMap::new()),
            delay: RwLock::new(None),
            writes: AtomicUsize::new(0),
        }
    }

    /// topic created behind the control plane back
    pub async fn insert_topic(&self, name: &str, spec: TopicSpec) {
        let topic = Self::topic(name, &spec);
        self.topics.write().await.insert(name.to_owned(), topic);
    }

    pub async fn topic_description(&self, name: &str) -> Option<TopicDescription> {
        self.topics
            .read()
            .await
            .get(name)
            .map(|topic| topic.description.clone())
    }

    /// pretend records were produced
    pub async fn produce(&self, name: &str, partition: PartitionId, records: Offset) {
        if let Some(topic) = self.topics.write().await.get_mut(name) {
            if let Some((_, latest)) = topic.offsets.get_mut(&partition) {
                *latest += records;
            }
        }
    }

    pub async fn acls(&self) -> BTreeSet<AclBinding> {
        self.acls.read().await.clone()
    }

    /// every write on `name` fails with `error` until cleared
    pub async fn fail_on(&self, name: &str, error: RemoteError) {
        self.failures.write().await.insert(name.to_owned(), error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// slow down every call
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// number of writes actually applied
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn topic(name: &str, spec: &TopicSpec) -> MemoryTopic {
        MemoryTopic {
            description: TopicDescription {
                name: name.to_owned(),
                partitions: spec.partitions,
                replication_factor: spec.replication_factor,
                configs: spec.configs.clone(),
                internal: name.starts_with("__"),
            },
            offsets: (0..spec.partitions).map(|p| (p, (0, 0))).collect(),
        }
    }

    async fn before_call(&self, name: &str) -> Result<(), RemoteError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        match self.failures.read().await.get(name) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn check_spec(&self, spec: &TopicSpec) -> Result<(), RemoteError> {
        if spec.replication_factor < 1 || spec.replication_factor > self.broker_count {
            return Err(RemoteError::broker(
                "INVALID_REPLICATION_FACTOR",
                format!(
                    "Replication factor: {} larger than available brokers: {}.",
                    spec.replication_factor, self.broker_count
                ),
            ));
        }
        if spec.partitions < 1 {
            return Err(RemoteError::broker(
                "INVALID_PARTITIONS",
                "Number of partitions must be larger than 0.",
            ));
        }
        Self::check_configs(&spec.configs)
    }

    fn check_configs(configs: &BTreeMap<String, String>) -> Result<(), RemoteError> {
        for (key, value) in configs {
            if key.ends_with(".ms") && value.parse::<i64>().is_err() {
                return Err(RemoteError::broker(
                    "INVALID_CONFIG",
                    format!("Invalid value {value} for configuration {key}: Not a number of type LONG"),
                ));
            }
        }
        Ok(())
    }

    fn unknown_topic(name: &str) -> RemoteError {
        RemoteError::broker(
            "UNKNOWN_TOPIC_OR_PARTITION",
            format!("This server does not host this topic-partition: {name}"),
        )
    }
}

#[async_trait]
impl BrokerAdmin for MemoryBrokerAdmin {
    async fn describe_topics(&self) -> Result<Vec<TopicDescription>, RemoteError> {
        self.before_call("").await?;
        Ok(self
            .topics
            .read()
            .await
            .values()
            .map(|topic| topic.description.clone())
            .collect())
    }

    async fn create_topic(
        &self,
        name: &str,
        spec: &TopicSpec,
        validate_only: bool,
    ) -> Result<(), RemoteError> {
        self.before_call(name).await?;
        self.check_spec(spec)?;
        let mut topics = self.topics.write().await;
        if topics.contains_key(name) {
            return Err(RemoteError::broker(
                "TOPIC_ALREADY_EXISTS",
                format!("Topic '{name}' already exists."),
            ));
        }
        if !validate_only {
            debug!(name, "memory broker: create topic");
            topics.insert(name.to_owned(), Self::topic(name, spec));
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn alter_topic_config(
        &self,
        name: &str,
        configs: &BTreeMap<String, String>,
        validate_only: bool,
    ) -> Result<(), RemoteError> {
        self.before_call(name).await?;
        Self::check_configs(configs)?;
        let mut topics = self.topics.write().await;
        let topic = topics.get_mut(name).ok_or_else(|| Self::unknown_topic(name))?;
        if !validate_only {
            topic.description.configs = configs.clone();
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn create_partitions(&self, name: &str, total: PartitionCount) -> Result<(), RemoteError> {
        self.before_call(name).await?;
        let mut topics = self.topics.write().await;
        let topic = topics.get_mut(name).ok_or_else(|| Self::unknown_topic(name))?;
        let current = topic.description.partitions;
        if total <= current {
            return Err(RemoteError::broker(
                "INVALID_PARTITIONS",
                format!("Topic currently has {current} partitions, which is higher than the requested {total}."),
            ));
        }
        for partition in current..total {
            topic.offsets.insert(partition, (0, 0));
        }
        topic.description.partitions = total;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<(), RemoteError> {
        self.before_call(name).await?;
        match self.topics.write().await.remove(name) {
            Some(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(Self::unknown_topic(name)),
        }
    }

    async fn list_offsets(&self, name: &str) -> Result<BTreeMap<PartitionId, Offset>, RemoteError> {
        self.before_call("").await?;
        let topics = self.topics.read().await;
        let topic = topics.get(name).ok_or_else(|| Self::unknown_topic(name))?;
        Ok(topic
            .offsets
            .iter()
            .map(|(partition, (_, latest))| (*partition, *latest))
            .collect())
    }

    async fn delete_records(
        &self,
        name: &str,
        offsets: &BTreeMap<PartitionId, Offset>,
    ) -> Result<BTreeMap<PartitionId, Offset>, RemoteError> {
        self.before_call(name).await?;
        let mut topics = self.topics.write().await;
        let topic = topics.get_mut(name).ok_or_else(|| Self::unknown_topic(name))?;
        let mut low_water_marks = BTreeMap::new();
        for (partition, offset) in offsets {
            let (low, latest) = topic
                .offsets
                .get_mut(partition)
                .ok_or_else(|| Self::unknown_topic(name))?;
            if *offset > *latest {
                return Err(RemoteError::broker(
                    "OFFSET_OUT_OF_RANGE",
                    format!("Offset {offset} is past the end of partition {partition}"),
                ));
            }
            *low = (*low).max(*offset);
            low_water_marks.insert(*partition, *low);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(low_water_marks)
    }

    async fn describe_acls(&self) -> Result<Vec<AclBinding>, RemoteError> {
        self.before_call("").await?;
        Ok(self.acls.read().await.iter().cloned().collect())
    }

    async fn create_acls(&self, bindings: &[AclBinding]) -> Result<(), RemoteError> {
        self.before_call("").await?;
        let mut acls = self.acls.write().await;
        acls.extend(bindings.iter().cloned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryConnectClient {
    connectors: RwLock<BTreeMap<String, ConnectorInfo>>,
    /// config key => error reported by validation
    rejections: RwLock<BTreeMap<String, String>>,
    failures: RwLock<BTreeMap<String, RemoteError>>,
    writes: AtomicUsize,
}

impl MemoryConnectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// connector deployed behind the control plane back
    pub async fn insert_connector(&self, name: &str, config: BTreeMap<String, String>) {
        let info = Self::running(name, config);
        self.connectors.write().await.insert(name.to_owned(), info);
    }

    pub async fn get(&self, name: &str) -> Option<ConnectorInfo> {
        self.connectors.read().await.get(name).cloned()
    }

    pub async fn reject_key(&self, key: &str, error: &str) {
        self.rejections
            .write()
            .await
            .insert(key.to_owned(), error.to_owned());
    }

    /// reading connector `name` fails with `error` until cleared
    pub async fn fail_on(&self, name: &str, error: RemoteError) {
        self.failures.write().await.insert(name.to_owned(), error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn running(name: &str, mut config: BTreeMap<String, String>) -> ConnectorInfo {
        config.insert("name".to_owned(), name.to_owned());
        ConnectorInfo {
            name: name.to_owned(),
            config,
            status: ConnectorStatus {
                state: ConnectorState::Running,
                worker_id: "memory:8083".to_owned(),
                tasks: vec![TaskStatus {
                    id: 0,
                    state: ConnectorState::Running,
                    worker_id: "memory:8083".to_owned(),
                    trace: None,
                }],
                ..Default::default()
            },
        }
    }

    fn not_found(name: &str) -> RemoteError {
        RemoteError::Http {
            status: 404,
            message: format!("Connector {name} not found"),
        }
    }
}

#[async_trait]
impl ConnectClient for MemoryConnectClient {
    async fn list_connectors(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.connectors.read().await.keys().cloned().collect())
    }

    async fn connector(&self, name: &str) -> Result<Option<ConnectorInfo>, RemoteError> {
        if let Some(error) = self.failures.read().await.get(name) {
            return Err(error.clone());
        }
        Ok(self.get(name).await)
    }

    async fn put_connector(
        &self,
        name: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        if !config.contains_key(CONNECTOR_CLASS_KEY) {
            return Err(RemoteError::Http {
                status: 400,
                message: format!("Connector config {config:?} contains no connector type"),
            });
        }
        let info = Self::running(name, config.clone());
        self.connectors.write().await.insert(name.to_owned(), info);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_connector(&self, name: &str) -> Result<(), RemoteError> {
        match self.connectors.write().await.remove(name) {
            Some(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(Self::not_found(name)),
        }
    }

    async fn change_state(&self, name: &str, action: ConnectorAction) -> Result<u16, RemoteError> {
        let mut connectors = self.connectors.write().await;
        let info = connectors.get_mut(name).ok_or_else(|| Self::not_found(name))?;
        let state = match action {
            ConnectorAction::Pause => ConnectorState::Paused,
            ConnectorAction::Resume | ConnectorAction::Restart => ConnectorState::Running,
        };
        info.status.state = state;
        for task in info.status.tasks.iter_mut() {
            task.state = state;
        }
        Ok(match action {
            ConnectorAction::Restart => 204,
            _ => 202,
        })
    }

    async fn validate(
        &self,
        _class: &str,
        config: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, RemoteError> {
        let rejections = self.rejections.read().await;
        Ok(config
            .iter()
            .filter_map(|(key, value)| {
                rejections
                    .get(key)
                    .map(|error| invalid_value(value, key, error))
            })
            .collect())
    }
}
