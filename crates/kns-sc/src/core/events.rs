use std::collections::VecDeque;
use std::fmt;

use async_lock::Mutex;
use tracing::trace;

use kns_metadata::core::ResourceKey;
use kns_types::event::changes::{ChangeListener, ChangePublisher, SharedChangePublisher};

const MAX_RETAINED_EVENTS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    Applied,
    Deleted,
    Imported,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Applied => "applied",
            Self::Deleted => "deleted",
            Self::Imported => "imported",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEvent {
    pub epoch: u64,
    pub action: ResourceAction,
    pub key: ResourceKey,
}

/// Resource changes made by the apply pipeline.
/// Emitting never waits on listeners, old events are dropped.
#[derive(Debug)]
pub struct ResourceEvents {
    publisher: SharedChangePublisher,
    events: Mutex<VecDeque<ResourceEvent>>,
}

impl Default for ResourceEvents {
    fn default() -> Self {
        Self {
            publisher: ChangePublisher::shared(),
            events: Mutex::new(VecDeque::new()),
        }
    }
}

impl ResourceEvents {
    pub async fn emit(&self, action: ResourceAction, key: ResourceKey) {
        let mut events = self.events.lock().await;
        let epoch = self.publisher.notify();
        trace!(epoch, %action, %key, "resource event");
        if events.len() == MAX_RETAINED_EVENTS {
            events.pop_front();
        }
        events.push_back(ResourceEvent { epoch, action, key });
    }

    pub fn epoch(&self) -> u64 {
        self.publisher.epoch()
    }

    pub fn change_listener(&self) -> ChangeListener {
        self.publisher.change_listener()
    }

    /// retained events newer than `epoch`
    pub async fn since(&self, epoch: u64) -> Vec<ResourceEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.epoch > epoch)
            .cloned()
            .collect()
    }
}
