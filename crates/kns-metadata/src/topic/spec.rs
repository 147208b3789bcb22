//!
//! # Topic Spec
//!
//! Desired partition count, replication factor and broker side configs.
//!
use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use kns_types::defaults::{CLEANUP_POLICY_KEY, TOPIC_NAME_MAX_LEN};
use kns_types::{PartitionCount, ReplicationFactor};

use crate::core::validate_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    pub partitions: PartitionCount,
    pub replication_factor: ReplicationFactor,
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
}

impl TopicSpec {
    pub fn new(partitions: PartitionCount, replication_factor: ReplicationFactor) -> Self {
        Self {
            partitions,
            replication_factor,
            configs: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(key.into(), value.into());
        self
    }

    pub fn is_compacted(&self) -> bool {
        self.configs
            .get(CLEANUP_POLICY_KEY)
            .map(|policy| policy.split(',').any(|p| p.trim() == "compact"))
            .unwrap_or(false)
    }

    /// broker side metric names replace '.' by '_'
    pub fn collision_key(name: &str) -> String {
        name.replace('.', "_")
    }
}

/// validate topic name, return one error per violated rule
pub fn validate_topic_name(name: &str) -> Vec<String> {
    let mut errors = validate_name(name);
    if name.len() > TOPIC_NAME_MAX_LEN {
        errors.push(format!(
            "Invalid value {name} for name: Value must not be longer than {TOPIC_NAME_MAX_LEN}"
        ));
    }
    errors
}
