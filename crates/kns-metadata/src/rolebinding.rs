use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::core::Spec;
use crate::extended::{ResourceKind, SpecExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
}

impl Verb {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectType {
    Group,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub resource_types: Vec<String>,
    pub verbs: Vec<Verb>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_type: SubjectType,
    pub subject_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBindingSpec {
    pub role: Role,
    pub subject: Subject,
}

impl Spec for RoleBindingSpec {
    const LABEL: &'static str = "RoleBinding";
    type Status = ();
}

impl SpecExt for RoleBindingSpec {
    const KIND: ResourceKind = ResourceKind::RoleBinding;
}

impl RoleBindingSpec {
    pub fn for_group(group: impl Into<String>, kinds: &[ResourceKind], verbs: &[Verb]) -> Self {
        Self {
            role: Role {
                resource_types: kinds.iter().map(|k| k.route().to_owned()).collect(),
                verbs: verbs.to_vec(),
            },
            subject: Subject {
                subject_type: SubjectType::Group,
                subject_name: group.into(),
            },
        }
    }

    pub fn binds(&self, principal: &str, groups: &BTreeSet<String>) -> bool {
        match self.subject.subject_type {
            SubjectType::Group => groups.contains(&self.subject.subject_name),
            SubjectType::User => self.subject.subject_name == principal,
        }
    }

    pub fn grants(&self, kind: ResourceKind, verb: Verb) -> bool {
        self.role.verbs.contains(&verb)
            && self.role.resource_types.iter().any(|ty| ty == kind.route())
    }
}

#[cfg(test)]
mod test {

    use std::collections::BTreeSet;

    use crate::extended::ResourceKind;

    use super::{RoleBindingSpec, Verb};

    #[test]
    fn test_role_binding_grants() {
        let rb = RoleBindingSpec::for_group(
            "group1",
            &[ResourceKind::Topic, ResourceKind::AccessControlEntry],
            &[Verb::Get, Verb::Post],
        );
        let groups = BTreeSet::from(["group1".to_owned()]);
        assert!(rb.binds("alice", &groups));
        assert!(!rb.binds("alice", &BTreeSet::new()));
        assert!(rb.grants(ResourceKind::Topic, Verb::Post));
        assert!(!rb.grants(ResourceKind::Topic, Verb::Delete));
        assert!(!rb.grants(ResourceKind::Connector, Verb::Get));
    }

    #[test]
    fn test_role_binding_yaml() {
        let yaml = r#"
role:
  resourceTypes: [topics, acls]
  verbs: [GET, POST]
subject:
  subjectType: GROUP
  subjectName: group1
"#;
        let rb: RoleBindingSpec = serde_yaml::from_str(yaml).expect("parse");
        assert!(rb.grants(ResourceKind::AccessControlEntry, Verb::Get));
    }
}
