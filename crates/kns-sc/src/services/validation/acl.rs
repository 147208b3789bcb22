use async_trait::async_trait;

use kns_auth::{Identity, PolicySource};
use kns_metadata::acl::{AccessControlEntrySpec, Permission};
use kns_metadata::core::{Resource, validate_name};
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::validator::invalid_value;
use kns_store::ResourceRepository;

use crate::Result;
use crate::core::Context;
use crate::services::policy::RepositoryPolicy;

use super::{ValidateSpec, find_namespace};

#[async_trait]
impl ValidateSpec for AccessControlEntrySpec {
    async fn validate_local<R: ResourceRepository>(
        ctx: &Context<R>,
        namespace: &Resource<NamespaceSpec>,
        identity: &Identity,
        resource: &Resource<Self>,
    ) -> Result<Vec<String>> {
        let ace = &resource.spec;
        let granting = namespace.name();
        let mut errors = validate_name(resource.name());

        if !identity.admin {
            if ace.permission == Permission::Owner {
                errors.push(invalid_value(
                    ace.permission,
                    "permission",
                    "String must be one of: READ, WRITE",
                ));
            }
            if ace.granted_to == granting {
                errors.push(invalid_value(
                    &ace.granted_to,
                    "grantedTo",
                    "Value must not be the current namespace",
                ));
            }

            let owned = RepositoryPolicy::new(ctx.repo().clone())
                .owner_entries(granting)
                .await?;
            if !owned.iter().any(|owner| owner.covers(ace)) {
                errors.push(format!(
                    "Invalid value {resource} for resource: Namespace is neither OWNER of LITERAL:{resource} nor top parent PREFIXED:{resource}",
                    resource = ace.resource
                ));
            }
        }

        match find_namespace(ctx.repo().as_ref(), &ace.granted_to).await? {
            Some(target) if target.cluster() == namespace.cluster() => {}
            _ => errors.push(invalid_value(
                &ace.granted_to,
                "grantedTo",
                "Namespace not found",
            )),
        }
        Ok(errors)
    }
}
