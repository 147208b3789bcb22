use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use kns_metadata::acl::ResourcePatternType;
use kns_metadata::topic::TopicSpec;
use kns_types::{Offset, PartitionCount, PartitionId, ReplicationFactor, TopicName};

use crate::RemoteError;

/// topic as described by the broker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: TopicName,
    pub partitions: PartitionCount,
    pub replication_factor: ReplicationFactor,
    /// non default configs only
    pub configs: BTreeMap<String, String>,
    pub internal: bool,
}

impl TopicDescription {
    pub fn to_spec(&self) -> TopicSpec {
        TopicSpec {
            partitions: self.partitions,
            replication_factor: self.replication_factor,
            configs: self.configs.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerResourceType {
    Topic,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclOperation {
    Read,
    Write,
    DescribeConfigs,
}

impl fmt::Display for AclOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::DescribeConfigs => "DESCRIBE_CONFIGS",
        };
        write!(f, "{label}")
    }
}

/// ALLOW binding for a principal on any host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclBinding {
    pub resource_type: BrokerResourceType,
    pub resource: String,
    pub pattern_type: ResourcePatternType,
    pub principal: String,
    pub operation: AclOperation,
}

impl fmt::Display for AclBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}:{}:{:?} {}",
            self.principal, self.resource_type, self.resource, self.pattern_type, self.operation
        )
    }
}

/// Admin operations of a broker cluster
#[async_trait]
pub trait BrokerAdmin: Debug + Send + Sync + 'static {
    /// every topic of the cluster
    async fn describe_topics(&self) -> Result<Vec<TopicDescription>, RemoteError>;

    async fn create_topic(
        &self,
        name: &str,
        spec: &TopicSpec,
        validate_only: bool,
    ) -> Result<(), RemoteError>;

    /// replace the non default configs of a topic
    async fn alter_topic_config(
        &self,
        name: &str,
        configs: &BTreeMap<String, String>,
        validate_only: bool,
    ) -> Result<(), RemoteError>;

    /// grow a topic to `total` partitions
    async fn create_partitions(&self, name: &str, total: PartitionCount) -> Result<(), RemoteError>;

    async fn delete_topic(&self, name: &str) -> Result<(), RemoteError>;

    /// latest offset of every partition
    async fn list_offsets(&self, name: &str) -> Result<BTreeMap<PartitionId, Offset>, RemoteError>;

    /// delete records before the given offsets, returns the new low water marks
    async fn delete_records(
        &self,
        name: &str,
        offsets: &BTreeMap<PartitionId, Offset>,
    ) -> Result<BTreeMap<PartitionId, Offset>, RemoteError>;

    async fn describe_acls(&self) -> Result<Vec<AclBinding>, RemoteError>;

    async fn create_acls(&self, bindings: &[AclBinding]) -> Result<(), RemoteError>;
}
