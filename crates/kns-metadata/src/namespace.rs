use serde::{Serialize, Deserialize};

use kns_types::ConnectClusterName;

use crate::core::Spec;
use crate::extended::{ResourceKind, SpecExt};
use crate::validator::{ConnectValidator, TopicValidator};

/// Tenancy boundary. The target cluster lives in `metadata.cluster`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    /// broker principal used by the namespace applications
    #[serde(default)]
    pub kafka_user: String,
    #[serde(default)]
    pub connect_clusters: Vec<ConnectClusterName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_validator: Option<TopicValidator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_validator: Option<ConnectValidator>,
}

impl Spec for NamespaceSpec {
    const LABEL: &'static str = "Namespace";
    type Status = ();
}

impl SpecExt for NamespaceSpec {
    const KIND: ResourceKind = ResourceKind::Namespace;
}

impl NamespaceSpec {
    pub fn can_reach(&self, connect_cluster: &str) -> bool {
        self.connect_clusters.iter().any(|c| c == connect_cluster)
    }
}
