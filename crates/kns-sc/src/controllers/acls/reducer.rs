//!
//! # Broker ACL derivation
//!
//! Access control entries translate to ALLOW bindings for the broker
//! principal of the namespace they are granted to.
//!
use std::collections::{BTreeSet, HashMap};

use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, Permission};
use kns_metadata::core::Resource;
use kns_metadata::namespace::NamespaceSpec;

use kns_types::defaults::CONNECT_GROUP_PREFIX;

use crate::clients::{AclBinding, AclOperation, BrokerResourceType};

pub fn principal(kafka_user: &str) -> String {
    format!("User:{kafka_user}")
}

fn operations(resource_type: AclResourceType, permission: Permission) -> Vec<(BrokerResourceType, AclOperation)> {
    use AclOperation::{DescribeConfigs, Read, Write};
    use BrokerResourceType::{Group, Topic};

    match (resource_type, permission) {
        (AclResourceType::Topic, Permission::Owner) => {
            vec![(Topic, Read), (Topic, Write), (Topic, DescribeConfigs)]
        }
        (AclResourceType::Topic, Permission::Read) => vec![(Topic, Read), (Topic, DescribeConfigs)],
        (AclResourceType::Topic, Permission::Write) => vec![(Topic, Write), (Topic, DescribeConfigs)],
        (AclResourceType::Group, Permission::Owner) => vec![(Group, Read)],
        (AclResourceType::Connect, Permission::Owner) => vec![(Group, Read)],
        _ => vec![],
    }
}

fn binding_resource(ace: &AccessControlEntrySpec) -> String {
    match ace.resource_type {
        AclResourceType::Connect => format!("{CONNECT_GROUP_PREFIX}{}", ace.resource),
        _ => ace.resource.clone(),
    }
}

/// Bindings required by the entries of one cluster. Entries granted to a
/// namespace without a broker user are skipped.
pub fn desired_bindings(
    namespaces: &[Resource<NamespaceSpec>],
    aces: &[Resource<AccessControlEntrySpec>],
) -> BTreeSet<AclBinding> {
    let users: HashMap<&str, &str> = namespaces
        .iter()
        .filter(|ns| !ns.spec.kafka_user.is_empty())
        .map(|ns| (ns.name(), ns.spec.kafka_user.as_str()))
        .collect();

    let mut bindings = BTreeSet::new();
    for ace in aces.iter().map(|ace| &ace.spec) {
        let Some(user) = users.get(ace.granted_to.as_str()) else {
            continue;
        };
        for (resource_type, operation) in operations(ace.resource_type, ace.permission) {
            bindings.insert(AclBinding {
                resource_type,
                resource: binding_resource(ace),
                pattern_type: ace.resource_pattern_type,
                principal: principal(user),
                operation,
            });
        }
    }
    bindings
}

#[derive(Debug, Default)]
pub struct AclPlan {
    pub missing: Vec<AclBinding>,
    /// held by a managed principal without a matching entry
    pub unsynchronized: Vec<AclBinding>,
}

pub fn plan_acls(
    desired: &BTreeSet<AclBinding>,
    actual: &[AclBinding],
    managed_principals: &BTreeSet<String>,
) -> AclPlan {
    let actual: BTreeSet<&AclBinding> = actual.iter().collect();
    AclPlan {
        missing: desired
            .iter()
            .filter(|binding| !actual.contains(binding))
            .cloned()
            .collect(),
        unsynchronized: actual
            .into_iter()
            .filter(|binding| {
                managed_principals.contains(&binding.principal) && !desired.contains(*binding)
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod test {

    use std::collections::BTreeSet;

    use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, Permission, ResourcePatternType};
    use kns_metadata::core::Resource;
    use kns_metadata::namespace::NamespaceSpec;

    use crate::clients::{AclBinding, AclOperation, BrokerResourceType};

    use super::{desired_bindings, plan_acls};

    fn namespace(name: &str, user: &str) -> Resource<NamespaceSpec> {
        Resource::named(
            name,
            NamespaceSpec {
                kafka_user: user.to_owned(),
                ..Default::default()
            },
        )
    }

    fn ace(resource_type: AclResourceType, resource: &str, permission: Permission, to: &str) -> Resource<AccessControlEntrySpec> {
        Resource::named(
            format!("{to}-{resource}"),
            AccessControlEntrySpec {
                permission,
                ..AccessControlEntrySpec::owner(resource_type, resource, ResourcePatternType::Prefixed, to)
            },
        )
    }

    #[test]
    fn test_desired_bindings() {
        let namespaces = vec![namespace("test", "u_test"), namespace("other", "u_other"), namespace("nouser", "")];
        let aces = vec![
            ace(AclResourceType::Topic, "test.", Permission::Owner, "test"),
            ace(AclResourceType::Topic, "test.shared.", Permission::Read, "other"),
            ace(AclResourceType::Connect, "test.", Permission::Owner, "test"),
            ace(AclResourceType::Topic, "x.", Permission::Owner, "nouser"),
        ];

        let bindings = desired_bindings(&namespaces, &aces);
        assert_eq!(bindings.len(), 6);
        assert!(bindings.contains(&AclBinding {
            resource_type: BrokerResourceType::Group,
            resource: "connect-test.".to_owned(),
            pattern_type: ResourcePatternType::Prefixed,
            principal: "User:u_test".to_owned(),
            operation: AclOperation::Read,
        }));
        let other: Vec<_> = bindings
            .iter()
            .filter(|b| b.principal == "User:u_other")
            .map(|b| b.operation)
            .collect();
        assert_eq!(other, vec![AclOperation::Read, AclOperation::DescribeConfigs]);
    }

    #[test]
    fn test_plan_reports_extra_bindings() {
        let namespaces = vec![namespace("test", "u_test")];
        let aces = vec![ace(AclResourceType::Group, "test.", Permission::Owner, "test")];
        let desired = desired_bindings(&namespaces, &aces);

        let extra = AclBinding {
            resource_type: BrokerResourceType::Topic,
            resource: "legacy".to_owned(),
            pattern_type: ResourcePatternType::Literal,
            principal: "User:u_test".to_owned(),
            operation: AclOperation::Write,
        };
        let foreign = AclBinding {
            principal: "User:someone".to_owned(),
            ..extra.clone()
        };
        let managed = BTreeSet::from(["User:u_test".to_owned()]);

        let plan = plan_acls(&desired, &[extra.clone(), foreign], &managed);
        assert_eq!(plan.missing.len(), 1);
        assert_eq!(plan.unsynchronized, vec![extra]);
    }
}
