use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use kns_types::defaults::IMPORTED_MESSAGE;

use crate::core::Status;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorState {
    #[default]
    Unassigned,
    Running,
    Paused,
    Failed,
    Restarting,
    Stopped,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub id: i32,
    pub state: ConnectorState,
    #[serde(default)]
    pub worker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    pub state: ConnectorState,
    #[serde(default)]
    pub worker_id: String,
    #[serde(default)]
    pub tasks: Vec<TaskStatus>,
    /// last error reported while reconciling
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Status for ConnectorStatus {}

impl ConnectorStatus {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: ConnectorState::Failed,
            message: message.into(),
            last_update: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// status of a connector fabricated from the connect runtime
    pub fn imported(observed: ConnectorStatus) -> Self {
        Self {
            message: IMPORTED_MESSAGE.to_owned(),
            last_update: Some(Utc::now()),
            ..observed
        }
    }

    pub fn same_outcome(&self, other: &Self) -> bool {
        self.state == other.state
            && self.worker_id == other.worker_id
            && self.tasks == other.tasks
            && self.message == other.message
    }
}
