mod fixture;

use std::time::Duration;

use fluvio_future::timer::sleep;

use kns_metadata::acl::AclResourceType;
use kns_metadata::connector::ConnectorSpec;
use kns_metadata::core::Resource;
use kns_metadata::topic::TopicSpec;
use kns_sc::{RemoteError, ScError, start_main_loop};
use kns_store::{NameSpace, ResourceRepository};

use fixture::{Fixture, config, member, topic, valid_topic_spec};

#[fluvio_future::test]
async fn test_broker_rejection_becomes_validation_error() {
    let fixture = Fixture::new();
    fixture.tenant("other", None).await;
    fixture.grant(AclResourceType::Topic, "other.", "other").await;

    let err = fixture
        .service
        .apply(&member(), "other", topic("other.topic", TopicSpec::new(3, 4)), false)
        .await
        .expect_err("rejected by broker");
    assert!(matches!(err, ScError::Validation(_)));
    assert_eq!(
        err.reasons(),
        vec!["Replication factor: 4 larger than available brokers: 3."]
    );
    assert!(fixture.admin.topic_description("other.topic").await.is_none());
}

#[fluvio_future::test]
async fn test_topic_collision() {
    let fixture = Fixture::with_test_namespace().await;
    fixture.admin.insert_topic("test.a.b", valid_topic_spec()).await;

    let err = fixture
        .service
        .apply(&member(), "test", topic("test.a_b", valid_topic_spec()), false)
        .await
        .expect_err("collision");
    assert_eq!(
        err.reasons(),
        vec!["Topic test.a_b collides with existing topics: test.a.b"]
    );
    assert!(
        fixture
            .repo
            .list::<TopicSpec>(&NameSpace::All)
            .await
            .expect("list")
            .is_empty()
    );
}

#[fluvio_future::test]
async fn test_connect_runtime_rejection() {
    let fixture = Fixture::with_test_namespace().await;
    fixture
        .connect
        .reject_key("file", "File must be an absolute path")
        .await;
    let sink = ConnectorSpec::new("local")
        .with_config("connector.class", "FileStreamSink")
        .with_config("topics", "test.topic")
        .with_config("file", "relative.txt");

    let err = fixture
        .service
        .apply(&member(), "test", Resource::named("test.sink", sink), false)
        .await
        .expect_err("rejected by connect");
    assert_eq!(
        err.reasons(),
        vec!["Invalid value relative.txt for configuration file: File must be an absolute path"]
    );
    assert_eq!(fixture.connect.writes(), 0);
}

#[fluvio_future::test]
async fn test_slow_broker_times_out() {
    let mut config = config();
    config.executor.remote_timeout = Duration::from_millis(50);
    let fixture = Fixture::with_config(config).owning_test_prefix().await;
    let service = &fixture.service;

    service
        .apply(&member(), "test", topic("test.topic", valid_topic_spec()), false)
        .await
        .expect("apply");

    fixture.admin.set_delay(Some(Duration::from_millis(500))).await;
    let err = service
        .apply(&member(), "test", topic("test.other", valid_topic_spec()), false)
        .await
        .expect_err("timeout");
    assert!(matches!(err, ScError::Remote(RemoteError::Timeout(_))), "{err:?}");

    let ctx = start_main_loop(fixture.ctx.clone());
    let mut failed_cycles = 0;
    for _ in 0..100 {
        sleep(Duration::from_millis(20)).await;
        failed_cycles = ctx
            .executors()
            .health("local-topic")
            .await
            .map(|health| health.failed_cycles)
            .unwrap_or_default();
        if failed_cycles >= 2 {
            break;
        }
    }
    assert!(failed_cycles >= 2, "topic executor failed {failed_cycles} cycles");
    assert!(fixture.admin.topic_description("test.topic").await.is_none());

    // loop keeps running and catches up once the broker answers
    fixture.admin.set_delay(None).await;
    let mut created = false;
    for _ in 0..100 {
        sleep(Duration::from_millis(20)).await;
        if fixture.admin.topic_description("test.topic").await.is_some() {
            created = true;
            break;
        }
    }
    assert!(created, "topic created after the broker recovered");
    ctx.shutdown();
}
