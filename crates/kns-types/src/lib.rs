pub mod defaults;
pub mod config_file;

#[cfg(feature = "events")]
pub mod event;

//
// Types
//
pub type Reason = String;
pub type Name = String;

// Tenancy
pub type NamespaceName = String;
pub type ClusterName = String;
pub type ConnectClusterName = String;
pub type GroupName = String;

// Topic
pub type TopicName = String;
pub type PartitionId = i32;
pub type PartitionCount = i32;
pub type ReplicationFactor = i32;
pub type Offset = i64;

// Connector
pub type ConnectorName = String;

/// revision token assigned by a repository on every write
pub type Revision = u64;
