//!
//! # Access control entries
//!
//! Grants a permission on a resource name pattern to a namespace. OWNER
//! entries drive authorization, READ and WRITE entries become broker ACLs.
//!
use std::fmt;

use serde::{Serialize, Deserialize};

use kns_types::NamespaceName;

use crate::core::Spec;
use crate::extended::{ResourceKind, SpecExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclResourceType {
    Topic,
    Connect,
    Group,
    ConnectCluster,
}

impl AclResourceType {
    /// ACE type guarding a resource kind, if ownership applies to it
    pub fn for_kind(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Topic | ResourceKind::DeleteRecords => Some(Self::Topic),
            ResourceKind::Connector | ResourceKind::ChangeConnectorState => Some(Self::Connect),
            _ => None,
        }
    }
}

impl fmt::Display for AclResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Topic => "TOPIC",
            Self::Connect => "CONNECT",
            Self::Group => "GROUP",
            Self::ConnectCluster => "CONNECT_CLUSTER",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourcePatternType {
    #[default]
    Literal,
    Prefixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Owner,
    Read,
    Write,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Owner => "OWNER",
            Self::Read => "READ",
            Self::Write => "WRITE",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlEntrySpec {
    pub resource_type: AclResourceType,
    pub resource: String,
    #[serde(default)]
    pub resource_pattern_type: ResourcePatternType,
    pub permission: Permission,
    pub granted_to: NamespaceName,
}

impl Spec for AccessControlEntrySpec {
    const LABEL: &'static str = "AccessControlEntry";
    type Status = ();
}

impl SpecExt for AccessControlEntrySpec {
    const KIND: ResourceKind = ResourceKind::AccessControlEntry;
}

impl AccessControlEntrySpec {
    pub fn owner(
        resource_type: AclResourceType,
        resource: impl Into<String>,
        pattern: ResourcePatternType,
        granted_to: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            resource: resource.into(),
            resource_pattern_type: pattern,
            permission: Permission::Owner,
            granted_to: granted_to.into(),
        }
    }

    /// does the pattern match a concrete resource name
    pub fn matches(&self, name: &str) -> bool {
        match self.resource_pattern_type {
            ResourcePatternType::Literal => self.resource == name,
            ResourcePatternType::Prefixed => name.starts_with(&self.resource),
        }
    }

    /// is every name matched by `other` also matched by this pattern
    pub fn covers(&self, other: &AccessControlEntrySpec) -> bool {
        if self.resource_type != other.resource_type {
            return false;
        }
        match (self.resource_pattern_type, other.resource_pattern_type) {
            (ResourcePatternType::Literal, ResourcePatternType::Literal) => {
                self.resource == other.resource
            }
            (ResourcePatternType::Literal, ResourcePatternType::Prefixed) => false,
            (ResourcePatternType::Prefixed, _) => other.resource.starts_with(&self.resource),
        }
    }

    pub fn grants_ownership(
        &self,
        namespace: &str,
        resource_type: AclResourceType,
        name: &str,
    ) -> bool {
        self.permission == Permission::Owner
            && self.granted_to == namespace
            && self.resource_type == resource_type
            && self.matches(name)
    }
}

#[cfg(test)]
mod test {

    use super::{AccessControlEntrySpec, AclResourceType, Permission, ResourcePatternType};

    fn prefixed(resource: &str) -> AccessControlEntrySpec {
        AccessControlEntrySpec::owner(
            AclResourceType::Topic,
            resource,
            ResourcePatternType::Prefixed,
            "test",
        )
    }

    #[test]
    fn test_pattern_match() {
        let ace = prefixed("test.");
        assert!(ace.matches("test.topic"));
        assert!(!ace.matches("other.topic"));

        let literal = AccessControlEntrySpec::owner(
            AclResourceType::Topic,
            "test.topic",
            ResourcePatternType::Literal,
            "test",
        );
        assert!(literal.matches("test.topic"));
        assert!(!literal.matches("test.topic2"));
    }

    #[test]
    fn test_ownership() {
        let ace = prefixed("test.");
        assert!(ace.grants_ownership("test", AclResourceType::Topic, "test.topic"));
        assert!(!ace.grants_ownership("other", AclResourceType::Topic, "test.topic"));
        assert!(!ace.grants_ownership("test", AclResourceType::Connect, "test.topic"));

        let read = AccessControlEntrySpec {
            permission: Permission::Read,
            ..prefixed("test.")
        };
        assert!(!read.grants_ownership("test", AclResourceType::Topic, "test.topic"));
    }

    #[test]
    fn test_covers() {
        let parent = prefixed("test.");
        assert!(parent.covers(&prefixed("test.sub.")));
        assert!(!parent.covers(&prefixed("tes")));
        let literal = AccessControlEntrySpec {
            resource_pattern_type: ResourcePatternType::Literal,
            ..prefixed("test.a")
        };
        assert!(parent.covers(&literal));
        assert!(!literal.covers(&parent));
    }
}
