use async_trait::async_trait;

use kns_auth::Identity;
use kns_metadata::core::{Resource, validate_name};
use kns_metadata::extended::ResourceKind;
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::rolebinding::RoleBindingSpec;
use kns_metadata::validator::invalid_value;
use kns_store::ResourceRepository;

use crate::Result;
use crate::core::Context;

use super::ValidateSpec;

#[async_trait]
impl ValidateSpec for RoleBindingSpec {
    async fn validate_local<R: ResourceRepository>(
        _ctx: &Context<R>,
        _namespace: &Resource<NamespaceSpec>,
        _identity: &Identity,
        resource: &Resource<Self>,
    ) -> Result<Vec<String>> {
        let spec = &resource.spec;
        let mut errors = validate_name(resource.name());

        for resource_type in &spec.role.resource_types {
            if resource_type.parse::<ResourceKind>().is_err() {
                let routes: Vec<&str> = ResourceKind::ALL.iter().map(|kind| kind.route()).collect();
                errors.push(invalid_value(
                    resource_type,
                    "resourceTypes",
                    format!("String must be one of: {}", routes.join(", ")),
                ));
            }
        }
        if spec.role.verbs.is_empty() {
            errors.push(invalid_value("[]", "verbs", "Value must not be empty"));
        }
        if spec.subject.subject_name.is_empty() {
            errors.push(invalid_value("", "subjectName", "String cannot be empty"));
        }
        Ok(errors)
    }
}
