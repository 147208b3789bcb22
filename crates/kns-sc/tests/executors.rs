mod fixture;

use std::time::Duration;

use fluvio_future::timer::sleep;

use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, Permission, ResourcePatternType};
use kns_metadata::core::Resource;
use kns_metadata::topic::{TopicPhase, TopicSpec};
use kns_sc::clients::{AclOperation, BrokerResourceType};
use kns_sc::controllers::Executor;
use kns_sc::controllers::acls::AclReconciler;
use kns_sc::controllers::topics::TopicReconciler;
use kns_sc::start_main_loop;

use fixture::{CLUSTER, Fixture, member, topic};

async fn converge(fixture: &Fixture) {
    TopicReconciler::new(fixture.ctx.clone(), CLUSTER)
        .run_cycle()
        .await
        .expect("topic cycle");
}

async fn apply_partitions(fixture: &Fixture, partitions: i32) {
    fixture
        .service
        .apply(&member(), "other", topic("other.topic", TopicSpec::new(partitions, 3)), false)
        .await
        .expect("apply");
}

#[fluvio_future::test]
async fn test_partitions_follow_applied_topic() {
    let fixture = Fixture::new();
    fixture.tenant("other", None).await;
    fixture.grant(AclResourceType::Topic, "other.", "other").await;

    apply_partitions(&fixture, 1).await;
    converge(&fixture).await;
    let description = fixture.admin.topic_description("other.topic").await.expect("created");
    assert_eq!(description.partitions, 1);

    apply_partitions(&fixture, 3).await;
    converge(&fixture).await;
    let description = fixture.admin.topic_description("other.topic").await.expect("topic");
    assert_eq!(description.partitions, 3);

    let stored = fixture
        .service
        .get::<TopicSpec>(&member(), "other", "other.topic")
        .await
        .expect("get")
        .expect("stored");
    assert_eq!(stored.status.expect("status").phase, TopicPhase::Success);

    apply_partitions(&fixture, 6).await;
    converge(&fixture).await;
    apply_partitions(&fixture, 3).await;
    converge(&fixture).await;

    let description = fixture.admin.topic_description("other.topic").await.expect("topic");
    assert_eq!(description.partitions, 6);
    let status = fixture
        .service
        .get::<TopicSpec>(&member(), "other", "other.topic")
        .await
        .expect("get")
        .expect("stored")
        .status
        .expect("status");
    assert_eq!(status.phase, TopicPhase::Failed);
    assert!(status.message.contains("Partition decrease"), "{}", status.message);
}

#[fluvio_future::test]
async fn test_granted_read_reaches_broker() {
    let fixture = Fixture::with_test_namespace().await;
    fixture.tenant("other", None).await;

    let grant = AccessControlEntrySpec {
        resource_type: AclResourceType::Topic,
        resource: "test.shared".to_owned(),
        resource_pattern_type: ResourcePatternType::Literal,
        permission: Permission::Read,
        granted_to: "other".to_owned(),
    };
    fixture
        .service
        .apply(&member(), "test", Resource::named("test-read-other", grant), false)
        .await
        .expect("grant");

    let reconciler = AclReconciler::new(fixture.ctx.clone(), CLUSTER);
    let report = reconciler.run_cycle().await.expect("acl cycle");
    // owner of topics: 3, owner of connectors: 1, read grant: 2
    assert_eq!(report.created.len(), 6);

    let bindings = fixture.admin.acls().await;
    let read = bindings
        .iter()
        .find(|binding| binding.principal == "User:u_other")
        .expect("read binding");
    assert_eq!(read.resource_type, BrokerResourceType::Topic);
    assert_eq!(read.resource, "test.shared");
    assert!(bindings.iter().any(|binding| {
        binding.principal == "User:u_test"
            && binding.resource_type == BrokerResourceType::Group
            && binding.resource == "connect-test."
            && binding.operation == AclOperation::Read
    }));

    let writes = fixture.admin.writes();
    let report = reconciler.run_cycle().await.expect("acl cycle");
    assert!(report.created.is_empty());
    assert_eq!(fixture.admin.writes(), writes);
}

#[fluvio_future::test]
async fn test_main_loop_runs_until_shutdown() {
    let fixture = Fixture::with_test_namespace().await;
    let ctx = start_main_loop(fixture.ctx.clone());

    let mut cycles = 0;
    for _ in 0..100 {
        sleep(Duration::from_millis(20)).await;
        cycles = ctx
            .executors()
            .health("local-topic")
            .await
            .map(|health| health.cycles)
            .unwrap_or_default();
        if cycles >= 2 {
            break;
        }
    }
    assert!(cycles >= 2, "topic executor ran {cycles} cycles");

    let names = ctx.executors().names().await;
    for name in ["local-topic", "local-connector", "local-acl"] {
        assert!(names.iter().any(|n| n == name), "{name} missing from {names:?}");
    }

    ctx.shutdown();
    sleep(Duration::from_millis(200)).await;
    let stopped = ctx
        .executors()
        .health("local-topic")
        .await
        .expect("registered")
        .cycles;
    sleep(Duration::from_millis(200)).await;
    let later = ctx
        .executors()
        .health("local-topic")
        .await
        .expect("registered")
        .cycles;
    assert_eq!(stopped, later);
}
