pub mod core;
pub mod namespace;
pub mod topic;
pub mod connector;
pub mod acl;
pub mod rolebinding;
pub mod command;
pub mod validator;

pub(crate) fn is_zero(value: &u64) -> bool {
    *value == 0
}

pub mod extended {

    use std::fmt;
    use std::str::FromStr;

    use serde::{Serialize, Deserialize};

    use super::core::Spec;

    /// kinds of objects handled by the control plane, commands included
    #[derive(Debug, Clone, Copy, PartialEq, Hash, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    pub enum ResourceKind {
        Namespace,
        Topic,
        Connector,
        AccessControlEntry,
        RoleBinding,
        ChangeConnectorState,
        DeleteRecords,
    }

    impl ResourceKind {
        pub const ALL: [ResourceKind; 7] = [
            Self::Namespace,
            Self::Topic,
            Self::Connector,
            Self::AccessControlEntry,
            Self::RoleBinding,
            Self::ChangeConnectorState,
            Self::DeleteRecords,
        ];

        pub fn label(&self) -> &'static str {
            match self {
                Self::Namespace => "Namespace",
                Self::Topic => "Topic",
                Self::Connector => "Connector",
                Self::AccessControlEntry => "AccessControlEntry",
                Self::RoleBinding => "RoleBinding",
                Self::ChangeConnectorState => "ChangeConnectorState",
                Self::DeleteRecords => "DeleteRecords",
            }
        }

        /// name used by role bindings to refer to this kind
        pub fn route(&self) -> &'static str {
            match self {
                Self::Namespace => "namespaces",
                Self::Topic => "topics",
                Self::Connector => "connectors",
                Self::AccessControlEntry => "acls",
                Self::RoleBinding => "role-bindings",
                Self::ChangeConnectorState => "change-connector-state",
                Self::DeleteRecords => "delete-records",
            }
        }
    }

    impl fmt::Display for ResourceKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.label())
        }
    }

    impl FromStr for ResourceKind {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::ALL
                .into_iter()
                .find(|kind| kind.route() == s || kind.label() == s)
                .ok_or_else(|| format!("unknown resource kind: {s}"))
        }
    }

    pub trait SpecExt: Spec {
        const KIND: ResourceKind;
    }
}
