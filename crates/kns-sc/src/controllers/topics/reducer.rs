//!
//! # Topic reducer
//!
//! Compares desired topics with the topics described by the broker.
//!
use std::collections::{BTreeMap, HashMap};

use kns_metadata::core::Resource;
use kns_metadata::topic::TopicSpec;
use kns_types::PartitionCount;

use crate::clients::TopicDescription;

/// what to do about one desired topic
#[derive(Debug, Clone, PartialEq)]
pub struct TopicAction {
    pub resource: Resource<TopicSpec>,
    pub create: bool,
    pub configs: Option<BTreeMap<String, String>>,
    pub partitions: Option<PartitionCount>,
    /// changes the broker cannot apply in place
    pub refused: Vec<String>,
}

impl TopicAction {
    fn new(resource: Resource<TopicSpec>) -> Self {
        Self {
            resource,
            create: false,
            configs: None,
            partitions: None,
            refused: vec![],
        }
    }

    pub fn has_remote_change(&self) -> bool {
        self.create || self.configs.is_some() || self.partitions.is_some()
    }
}

#[derive(Debug, Default)]
pub struct TopicPlan {
    pub actions: Vec<TopicAction>,
    pub unsynchronized: Vec<TopicDescription>,
}

pub fn plan_topics(desired: Vec<Resource<TopicSpec>>, actual: &[TopicDescription]) -> TopicPlan {
    let observed: HashMap<&str, &TopicDescription> = actual
        .iter()
        .filter(|topic| !topic.internal)
        .map(|topic| (topic.name.as_str(), topic))
        .collect();

    let unsynchronized = actual
        .iter()
        .filter(|topic| !topic.internal)
        .filter(|topic| !desired.iter().any(|d| d.name() == topic.name))
        .cloned()
        .collect();

    let actions = desired
        .into_iter()
        .map(|resource| {
            let current = observed.get(resource.name()).copied();
            diff_topic(resource, current)
        })
        .collect();

    TopicPlan {
        actions,
        unsynchronized,
    }
}

fn diff_topic(resource: Resource<TopicSpec>, actual: Option<&TopicDescription>) -> TopicAction {
    let mut action = TopicAction::new(resource);
    let Some(actual) = actual else {
        action.create = true;
        return action;
    };
    let desired = &action.resource.spec;

    if desired.configs != actual.configs {
        action.configs = Some(desired.configs.clone());
    }

    if desired.partitions > actual.partitions {
        action.partitions = Some(desired.partitions);
    } else if desired.partitions < actual.partitions {
        action.refused.push(format!(
            "Partition decrease from {} to {} is not supported",
            actual.partitions, desired.partitions
        ));
    }

    if desired.replication_factor != actual.replication_factor {
        action.refused.push(format!(
            "Replication factor change from {} to {} is not supported",
            actual.replication_factor, desired.replication_factor
        ));
    }
    action
}
