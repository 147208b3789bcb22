use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// authenticated caller, as handed over by the transport layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub principal: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub admin: bool,
}

impl Identity {
    pub fn new<I, G>(principal: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        Self {
            principal: principal.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            admin: false,
        }
    }

    pub fn admin(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            groups: BTreeSet::new(),
            admin: true,
        }
    }

    /// membership of the admin group grants the admin capability
    pub fn with_admin_group(mut self, admin_group: &str) -> Self {
        if self.groups.contains(admin_group) {
            self.admin = true;
        }
        self
    }
}
