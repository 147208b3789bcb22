use std::collections::HashMap;

use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::Resource;

use crate::clients::ConnectorInfo;

#[derive(Debug, Default)]
pub struct ConnectorPlan {
    /// missing on the runtime or deployed with another config
    pub deploy: Vec<Resource<ConnectorSpec>>,
    pub in_sync: Vec<(Resource<ConnectorSpec>, ConnectorInfo)>,
    pub unsynchronized: Vec<ConnectorInfo>,
}

/// plan for one connect cluster
pub fn plan_connectors(desired: Vec<Resource<ConnectorSpec>>, actual: Vec<ConnectorInfo>) -> ConnectorPlan {
    let mut observed: HashMap<String, ConnectorInfo> = actual
        .into_iter()
        .map(|info| (info.name.clone(), info))
        .collect();

    let mut plan = ConnectorPlan::default();
    for resource in desired {
        match observed.remove(resource.name()) {
            Some(info) if resource.spec.same_config(&info.config) => {
                plan.in_sync.push((resource, info));
            }
            _ => plan.deploy.push(resource),
        }
    }

    let mut unsynchronized: Vec<ConnectorInfo> = observed.into_values().collect();
    unsynchronized.sort_by(|a, b| a.name.cmp(&b.name));
    plan.unsynchronized = unsynchronized;
    plan
}
