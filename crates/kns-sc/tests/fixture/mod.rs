#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use kns_auth::Identity;
use kns_auth::rbac::RbacAuthorization;
use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, ResourcePatternType};
use kns_metadata::core::{ObjectMeta, Resource};
use kns_metadata::extended::ResourceKind;
use kns_metadata::namespace::NamespaceSpec;
use kns_metadata::rolebinding::{RoleBindingSpec, Verb};
use kns_metadata::topic::TopicSpec;
use kns_metadata::validator::TopicValidator;
use kns_sc::clients::memory::{MemoryBrokerAdmin, MemoryConnectClient};
use kns_sc::config::{ManagedClusterConfig, ScConfig};
use kns_sc::core::{Context, SharedContext};
use kns_sc::services::{ApplyService, RepositoryPolicy};
use kns_store::memory::MemoryRepository;

pub const CLUSTER: &str = "local";
pub const ADMIN_GROUP: &str = "kns-admins";

pub type Service = ApplyService<MemoryRepository, RbacAuthorization<RepositoryPolicy<MemoryRepository>>>;

pub struct Fixture {
    pub repo: Arc<MemoryRepository>,
    pub admin: Arc<MemoryBrokerAdmin>,
    pub connect: Arc<MemoryConnectClient>,
    pub ctx: SharedContext<MemoryRepository>,
    pub service: Service,
}

pub fn admin() -> Identity {
    Identity::new("admin", [ADMIN_GROUP])
}

pub fn member() -> Identity {
    Identity::new("alice", ["group1"])
}

pub fn config() -> ScConfig {
    let mut config = ScConfig {
        admin_group: ADMIN_GROUP.to_owned(),
        managed_clusters: vec![
            ManagedClusterConfig::managed(CLUSTER).with_connect("local", "http://localhost:8083"),
        ],
        ..Default::default()
    };
    config.executor.interval = Duration::from_millis(50);
    config.executor.remote_timeout = Duration::from_secs(2);
    config
}

pub fn namespace(name: &str, validator: Option<TopicValidator>) -> Resource<NamespaceSpec> {
    Resource::new(
        ObjectMeta {
            name: name.to_owned(),
            cluster: CLUSTER.to_owned(),
            ..Default::default()
        },
        NamespaceSpec {
            kafka_user: format!("u_{name}"),
            connect_clusters: vec!["local".to_owned()],
            topic_validator: validator,
            ..Default::default()
        },
    )
}

pub fn owner_ace(resource_type: AclResourceType, prefix: &str, namespace: &str) -> Resource<AccessControlEntrySpec> {
    Resource::named(
        format!("{namespace}-{}-{prefix}", resource_type.to_string().to_lowercase()),
        AccessControlEntrySpec::owner(resource_type, prefix, ResourcePatternType::Prefixed, namespace),
    )
}

pub fn topic(name: &str, spec: TopicSpec) -> Resource<TopicSpec> {
    Resource::named(name, spec)
}

/// partitions 3, replication factor 3, accepted by the default validator
pub fn valid_topic_spec() -> TopicSpec {
    TopicSpec::new(3, 3)
        .with_config("cleanup.policy", "delete")
        .with_config("min.insync.replicas", "2")
        .with_config("retention.ms", "60000")
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: ScConfig) -> Self {
        let repo = MemoryRepository::new_shared();
        let admin = Arc::new(MemoryBrokerAdmin::new(3));
        let connect = Arc::new(MemoryConnectClient::new());
        let ctx = Context::builder(config, repo.clone())
            .broker_admin(CLUSTER, admin.clone())
            .connect_client(CLUSTER, "local", connect.clone())
            .shared();
        let auth = RbacAuthorization::new(Arc::new(RepositoryPolicy::new(repo.clone())));
        let service = ApplyService::new(ctx.clone(), auth);
        Self {
            repo,
            admin,
            connect,
            ctx,
            service,
        }
    }

    /// namespace with a member role binding and no ownership
    pub async fn tenant(&self, name: &str, validator: Option<TopicValidator>) {
        self.service
            .apply_namespace(&admin(), namespace(name, validator), false)
            .await
            .expect("namespace");
        let binding = RoleBindingSpec::for_group(
            "group1",
            &[
                ResourceKind::Topic,
                ResourceKind::Connector,
                ResourceKind::AccessControlEntry,
                ResourceKind::ChangeConnectorState,
                ResourceKind::DeleteRecords,
            ],
            &[Verb::Get, Verb::Post, Verb::Put, Verb::Delete],
        );
        self.service
            .apply(&admin(), name, Resource::named(format!("{name}-members"), binding), false)
            .await
            .expect("role binding");
    }

    pub async fn grant(&self, resource_type: AclResourceType, prefix: &str, namespace: &str) {
        self.service
            .apply(&admin(), namespace, owner_ace(resource_type, prefix, namespace), false)
            .await
            .expect("owner ace");
    }

    /// namespace "test" owning topics and connectors prefixed "test."
    pub async fn with_test_namespace() -> Self {
        Self::new().owning_test_prefix().await
    }

    pub async fn owning_test_prefix(self) -> Self {
        self.tenant("test", Some(TopicValidator::make_default())).await;
        self.grant(AclResourceType::Topic, "test.", "test").await;
        self.grant(AclResourceType::Connect, "test.", "test").await;
        self
    }
}
