use std::collections::HashMap;
use std::sync::Arc;

use async_lock::{Mutex, MutexGuardArc};

use kns_metadata::core::ResourceKey;

/// One async mutex per resource key. Requests on different keys never wait
/// on each other.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<ResourceKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// the guard releases the key when dropped
    pub async fn lock(&self, key: &ResourceKey) -> MutexGuardArc<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            // unused entries are only referenced by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        entry.lock_arc().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
