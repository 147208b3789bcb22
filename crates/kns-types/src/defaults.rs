use std::time::Duration;

pub const API_VERSION: &str = "v1";

// executors
pub const EXECUTOR_INTERVAL: Duration = Duration::from_secs(10);
pub const EXECUTOR_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONFLICT_RETRIES: u16 = 3;

// controller loop
pub const CONTROLLER_ERROR_WAIT: Duration = Duration::from_secs(10);

// topics
pub const TOPIC_NAME_MAX_LEN: usize = 249;
pub const IMPORTED_MESSAGE: &str = "Imported from cluster";
pub const AWAITING_SYNC_MESSAGE: &str = "Awaiting sync";

// connectors
pub const CONNECTOR_CLASS_KEY: &str = "connector.class";
pub const CONNECT_GROUP_PREFIX: &str = "connect-";

pub const CLEANUP_POLICY_KEY: &str = "cleanup.policy";
pub const REPLICATION_FACTOR_KEY: &str = "replication.factor";
pub const PARTITIONS_KEY: &str = "partitions";
