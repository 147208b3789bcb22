use kns_metadata::core::{Resource, validate_name};
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::validator::invalid_value;
use kns_store::{NameSpace, ResourceRepository};

use crate::Result;
use crate::config::ScConfig;

/// namespace records are stored inside themselves
pub async fn find_namespace<R: ResourceRepository>(
    repo: &R,
    name: &str,
) -> Result<Option<Resource<NamespaceSpec>>> {
    let namespaces = repo.list::<NamespaceSpec>(&NameSpace::from(name)).await?;
    Ok(namespaces.into_iter().find(|ns| ns.name() == name))
}

pub fn validate_namespace(config: &ScConfig, resource: &Resource<NamespaceSpec>) -> Vec<String> {
    let mut errors = validate_name(resource.name());
    if resource.spec.kafka_user.is_empty() {
        errors.push(invalid_value("", "kafkaUser", "String cannot be empty"));
    }

    let Some(cluster) = config.cluster(resource.cluster()) else {
        let managed: Vec<&str> = config
            .managed_clusters
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        errors.push(invalid_value(
            resource.cluster(),
            "cluster",
            format!("String must be one of: {}", managed.join(", ")),
        ));
        return errors;
    };

    for connect in &resource.spec.connect_clusters {
        if !cluster.connects.contains_key(connect) {
            errors.push(invalid_value(
                connect,
                "connectClusters",
                format!("Connect cluster is not configured for cluster {}", cluster.name),
            ));
        }
    }
    errors
}
