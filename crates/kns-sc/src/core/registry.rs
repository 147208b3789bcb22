use std::collections::BTreeMap;

use async_lock::RwLock;
use chrono::{DateTime, Utc};

/// liveness of one executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorHealth {
    pub last_start: Option<DateTime<Utc>>,
    pub last_end: Option<DateTime<Utc>>,
    pub cycles: u64,
    /// cycles aborted by an error
    pub failed_cycles: u64,
    /// resources whose remote operation failed during the last cycle
    pub last_failures: usize,
    pub last_error: Option<String>,
}

impl ExecutorHealth {
    pub fn is_running(&self) -> bool {
        match (self.last_start, self.last_end) {
            (Some(start), Some(end)) => start > end,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Liveness of the executors, keyed by executor name
#[derive(Debug, Default)]
pub struct ExecutorRegistry {
    executors: RwLock<BTreeMap<String, ExecutorHealth>>,
}

impl ExecutorRegistry {
    pub async fn register(&self, name: &str) {
        self.executors
            .write()
            .await
            .entry(name.to_owned())
            .or_default();
    }

    pub async fn cycle_started(&self, name: &str) {
        let mut executors = self.executors.write().await;
        let health = executors.entry(name.to_owned()).or_default();
        health.last_start = Some(Utc::now());
    }

    pub async fn cycle_ended(&self, name: &str, failures: usize) {
        let mut executors = self.executors.write().await;
        let health = executors.entry(name.to_owned()).or_default();
        health.last_end = Some(Utc::now());
        health.cycles += 1;
        health.last_failures = failures;
        health.last_error = None;
    }

    pub async fn cycle_failed(&self, name: &str, error: String) {
        let mut executors = self.executors.write().await;
        let health = executors.entry(name.to_owned()).or_default();
        health.last_end = Some(Utc::now());
        health.cycles += 1;
        health.failed_cycles += 1;
        health.last_error = Some(error);
    }

    pub async fn health(&self, name: &str) -> Option<ExecutorHealth> {
        self.executors.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        self.executors.read().await.keys().cloned().collect()
    }
}
