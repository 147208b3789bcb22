use async_trait::async_trait;

use kns_auth::Identity;
use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::{Resource, validate_name};
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::validator::invalid_value;
use kns_store::ResourceRepository;
use kns_types::defaults::CONNECTOR_CLASS_KEY;

use crate::Result;
use crate::clients::bounded;
use crate::core::Context;

use super::{ValidateSpec, rejected};

const CONNECT_CLUSTER_FIELD: &str = "connectCluster";

#[async_trait]
impl ValidateSpec for ConnectorSpec {
    async fn validate_local<R: ResourceRepository>(
        ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        _identity: &Identity,
        resource: &Resource<Self>,
    ) -> Result<Vec<String>> {
        let spec = &resource.spec;
        let mut errors = validate_name(resource.name());

        if !namespace.spec.can_reach(&spec.connect_cluster) {
            errors.push(invalid_value(
                &spec.connect_cluster,
                CONNECT_CLUSTER_FIELD,
                format!(
                    "String must be one of: {}",
                    namespace.spec.connect_clusters.join(", ")
                ),
            ));
        } else if ctx
            .cluster(namespace.cluster())
            .and_then(|clients| clients.connect(&spec.connect_cluster))
            .is_none()
        {
            errors.push(invalid_value(
                &spec.connect_cluster,
                CONNECT_CLUSTER_FIELD,
                "Connect cluster is not configured",
            ));
        }

        match &namespace.spec.connect_validator {
            Some(validator) => errors.extend(validator.validate(spec)),
            None if spec.connector_class().is_none() => errors.push(invalid_value(
                "null",
                CONNECTOR_CLASS_KEY,
                "Value must be non-null",
            )),
            None => {}
        }
        Ok(errors)
    }

    async fn validate_remote<R: ResourceRepository>(
        ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        resource: &Resource<Self>,
        _existing: Option<&Resource<Self>>,
    ) -> Result<Vec<String>> {
        let spec = &resource.spec;
        let (Some(client), Some(class)) = (
            ctx.cluster(namespace.cluster())
                .and_then(|clients| clients.connect(&spec.connect_cluster)),
            spec.connector_class(),
        ) else {
            return Ok(vec![]);
        };

        match bounded(ctx.remote_timeout(), client.validate(class, &spec.config)).await {
            Ok(errors) => Ok(errors),
            Err(err) => rejected(Err(err)),
        }
    }
}
