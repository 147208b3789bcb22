//!
//! # Commands
//!
//! Transient request objects. They share the resource envelope but are never
//! stored; their status is filled in from the remote outcome.
//!
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use kns_types::Offset;

use crate::core::{Spec, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorAction {
    Restart,
    Pause,
    Resume,
}

impl fmt::Display for ConnectorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Restart => "restart",
            Self::Pause => "pause",
            Self::Resume => "resume",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeConnectorStateSpec {
    pub action: ConnectorAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeConnectorStateStatus {
    pub success: bool,
    /// http code reported by the connect runtime
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Status for ChangeConnectorStateStatus {}

impl Spec for ChangeConnectorStateSpec {
    const LABEL: &'static str = "ChangeConnectorState";
    type Status = ChangeConnectorStateStatus;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecordsSpec {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordsStatus {
    pub success: bool,
    /// keyed by `{topic}-{partition}`
    #[serde(default)]
    pub low_water_marks: BTreeMap<String, Offset>,
}

impl Status for DeleteRecordsStatus {}

impl Spec for DeleteRecordsSpec {
    const LABEL: &'static str = "DeleteRecordsResponse";
    type Status = DeleteRecordsStatus;
}
