//!
//! # Resource envelope
//!
//! Every object handled by the control plane shares the same envelope:
//! kind, metadata, desired spec and an optional observed status.
//!
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;

use kns_types::Revision;
use kns_types::defaults::API_VERSION;

use crate::extended::{ResourceKind, SpecExt};

static RESOURCE_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new("^[a-zA-Z0-9_.-]+$").ok());

/// Name rules shared by every kind. Names end up in broker requests and in
/// file paths, so separators and relative segments are refused.
pub fn validate_name(name: &str) -> Vec<String> {
    if name.is_empty() {
        return vec!["Invalid value  for name: Value must not be empty".to_owned()];
    }
    let mut errors = vec![];
    if name == "." || name == ".." {
        errors.push(format!("Invalid value {name} for name: Value must not be \".\" or \"..\""));
    }
    let valid_chars = RESOURCE_NAME
        .as_ref()
        .map(|regex| regex.is_match(name))
        .unwrap_or(false);
    if !valid_chars {
        errors.push(format!(
            "Invalid value {name} for name: Value must only contain ASCII alphanumerics, '.', '_' or '-'"
        ));
    }
    errors
}

/// observed state, written by the control plane only
pub trait Status:
    Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl Status for () {}

pub trait Spec:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const LABEL: &'static str;
    type Status: Status;

    /// kind specific equality used to detect an unchanged apply
    fn same_desired(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default, setter(into))]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub resource_version: Revision,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// keep labels and creation time of the stored object,
    /// labels on the submitted object win on conflict
    pub fn merge_onto(&self, existing: &ObjectMeta) -> ObjectMeta {
        let mut labels = existing.labels.clone();
        labels.extend(self.labels.clone());
        ObjectMeta {
            name: existing.name.clone(),
            namespace: existing.namespace.clone(),
            cluster: existing.cluster.clone(),
            labels,
            creation_timestamp: existing.creation_timestamp,
            resource_version: existing.resource_version,
        }
    }
}

/// identity of a stored resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub cluster: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        cluster: impl Into<String>,
        namespace: impl Into<String>,
        kind: ResourceKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: namespace.into(),
            kind,
            name: name.into(),
        }
    }

    /// key inside the store of a single kind
    pub fn store_key(&self) -> String {
        format!("{}/{}/{}", self.cluster, self.namespace, self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.cluster,
            self.namespace,
            self.kind.route(),
            self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Resource<S: Spec> {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<S::Status>,
}

impl<S: Spec> Resource<S> {
    pub fn new(metadata: ObjectMeta, spec: S) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: S::LABEL.to_owned(),
            metadata,
            spec,
            status: None,
        }
    }

    pub fn named(name: impl Into<String>, spec: S) -> Self {
        Self::new(ObjectMeta::named(name), spec)
    }

    pub fn with_status(mut self, status: S::Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn cluster(&self) -> &str {
        &self.metadata.cluster
    }

    pub fn revision(&self) -> Revision {
        self.metadata.resource_version
    }

    /// fill in envelope fields the submitter may have left out
    pub fn normalize(mut self) -> Self {
        self.api_version = API_VERSION.to_owned();
        self.kind = S::LABEL.to_owned();
        self
    }
}

impl<S: Spec> FromStr for Resource<S> {
    type Err = serde_yaml::Error;

    /// parse a yaml manifest
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let resource: Self = serde_yaml::from_str(s)?;
        Ok(resource.normalize())
    }
}

impl<S: SpecExt> Resource<S> {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.cluster(), self.namespace(), S::KIND, self.name())
    }
}

#[cfg(test)]
mod test {

    use crate::topic::TopicSpec;

    use super::{ObjectMetaBuilder, Resource, validate_name};

    #[test]
    fn test_names_cannot_leave_their_directory() {
        assert!(validate_name("test.sink").is_empty());
        assert!(validate_name("test-members").is_empty());
        assert_eq!(validate_name("..").len(), 1);
        assert_eq!(validate_name("test./../../escaped").len(), 1);
        assert_eq!(validate_name("a\\b").len(), 1);
        assert_eq!(validate_name("").len(), 1);
    }

    #[test]
    fn test_merge_keeps_existing_metadata() {
        let created = chrono::Utc::now();
        let existing = ObjectMetaBuilder::default()
            .name("test.topic")
            .namespace("test")
            .cluster("local")
            .labels([("team".to_owned(), "a".to_owned())])
            .creation_timestamp(Some(created))
            .resource_version(4u64)
            .build()
            .expect("meta");
        let submitted = ObjectMetaBuilder::default()
            .name("test.topic")
            .labels([("env".to_owned(), "dev".to_owned())])
            .build()
            .expect("meta");

        let merged = submitted.merge_onto(&existing);
        assert_eq!(merged.creation_timestamp, Some(created));
        assert_eq!(merged.resource_version, 4);
        assert_eq!(merged.cluster, "local");
        assert_eq!(merged.labels.len(), 2);
    }

    #[test]
    fn test_envelope_from_yaml() {
        let yaml = r#"
metadata:
  name: test.topic
spec:
  partitions: 3
  replicationFactor: 3
  configs:
    cleanup.policy: delete
"#;
        let raw: Resource<TopicSpec> = serde_yaml::from_str(yaml).expect("parse");
        assert!(raw.kind.is_empty());
        let topic: Resource<TopicSpec> = yaml.parse().expect("parse");
        assert_eq!(topic.kind, "Topic");
        assert_eq!(topic.api_version, "v1");
        assert_eq!(topic.spec.partitions, 3);
        assert!(topic.status.is_none());
    }
}
