use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use kns_auth::Identity;
use kns_metadata::core::Resource;
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::topic::{TopicSpec, validate_topic_name};
use kns_store::{NameSpace, ResourceRepository};

use crate::Result;
use crate::clients::bounded;
use crate::core::Context;

use super::{ValidateSpec, rejected};

#[async_trait]
impl ValidateSpec for TopicSpec {
    async fn validate_local<R: ResourceRepository>(
        _ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        _identity: &Identity,
        resource: &Resource<Self>,
    ) -> Result<Vec<String>> {
        let mut errors = validate_topic_name(resource.name());
        if let Some(validator) = &namespace.spec.topic_validator {
            errors.extend(validator.validate(&resource.spec));
        }
        Ok(errors)
    }

    async fn validate_remote<R: ResourceRepository>(
        ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        resource: &Resource<Self>,
        existing: Option<&Resource<Self>>,
    ) -> Result<Vec<String>> {
        let Some(clients) = ctx.cluster(namespace.cluster()) else {
            return Ok(vec![format!("Cluster {} is not managed", namespace.cluster())]);
        };
        if !clients.has_admin() {
            debug!(cluster = %namespace.cluster(), "no broker admin, skipping remote validation");
            return Ok(vec![]);
        }
        let admin = clients.admin()?;
        let timeout = ctx.remote_timeout();
        let name = resource.name();

        let actual = bounded(timeout, admin.describe_topics()).await?;
        let stored = ctx.repo().list::<TopicSpec>(&NameSpace::All).await?;

        let key = TopicSpec::collision_key(name);
        let collisions: BTreeSet<&str> = stored
            .iter()
            .filter(|topic| topic.cluster() == namespace.cluster())
            .map(|topic| topic.name())
            .chain(actual.iter().map(|topic| topic.name.as_str()))
            .filter(|other| *other != name && TopicSpec::collision_key(other) == key)
            .collect();
        if !collisions.is_empty() {
            let others: Vec<&str> = collisions.into_iter().collect();
            return Ok(vec![format!(
                "Topic {name} collides with existing topics: {}",
                others.join(", ")
            )]);
        }

        let on_broker = actual.iter().any(|topic| topic.name == name);
        if existing.is_some() && !on_broker {
            debug!(name, "stored topic not created yet, validating as new");
        }
        let result = if on_broker {
            bounded(
                timeout,
                admin.alter_topic_config(name, &resource.spec.configs, true),
            )
            .await
        } else {
            bounded(timeout, admin.create_topic(name, &resource.spec, true)).await
        };
        rejected(result)
    }
}
