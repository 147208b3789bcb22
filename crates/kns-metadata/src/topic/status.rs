use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use kns_types::defaults::{AWAITING_SYNC_MESSAGE, IMPORTED_MESSAGE};

use crate::core::Status;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicPhase {
    Success,
    #[default]
    Pending,
    Failed,
}

impl fmt::Display for TopicPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "Success",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStatus {
    pub phase: TopicPhase,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Status for TopicStatus {}

impl TopicStatus {
    fn new(phase: TopicPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            last_update: Some(Utc::now()),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(TopicPhase::Success, message)
    }

    pub fn pending() -> Self {
        Self::new(TopicPhase::Pending, AWAITING_SYNC_MESSAGE)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TopicPhase::Failed, message)
    }

    pub fn imported() -> Self {
        Self::success(IMPORTED_MESSAGE)
    }

    /// same phase and message, update time ignored
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.phase == other.phase && self.message == other.message
    }
}
