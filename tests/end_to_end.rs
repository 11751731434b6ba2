//! End-to-end scenarios through the public surface: registry resolution,
//! session lifecycle, checkpoint round-trips, and the consume-loop driver.

use ingest_core::{
    CheckpointConfig, FieldDefinition, FieldType, NullMetricsSink, Offset, Record, Schema,
    StreamConfig, StreamConsumerFactory, StreamLevelConsumer,
};
use serde_json::json;
use std::sync::Arc;
use stream_ingest::consume::{self, ConsumeOpts};
use stream_ingest::{builtin_registry, memory};

fn event_schema() -> Schema {
    Schema::new(vec![
        FieldDefinition::new("id", FieldType::Int),
        FieldDefinition::new("message", FieldType::String),
    ])
    .unwrap()
}

fn publish_events(stream: &str, count: i64) {
    memory::reset(stream);
    let topic = memory::topic(stream);
    for i in 0..count {
        topic.publish_json(json!({"id": i, "message": format!("event-{i}")}));
    }
}

fn memory_config(stream: &str, checkpoint_dir: &std::path::Path) -> StreamConfig {
    let mut config = StreamConfig::new("memory", stream, 0);
    config.fetch_timeout_ms = 50;
    config.checkpoint = CheckpointConfig::Filesystem {
        dir: checkpoint_dir.to_path_buf(),
    };
    config
}

#[tokio::test]
async fn five_record_commit_then_replay_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let stream = "e2e-five-record-round-trip";
    publish_events(stream, 5);

    let registry = builtin_registry();
    let config = memory_config(stream, dir.path());
    let schema = event_schema();

    let factory = registry.resolve(&config, &schema).unwrap();
    let mut session = factory.create_consumer().unwrap();
    session
        .init(&config, Arc::new(NullMetricsSink))
        .await
        .unwrap();
    session.start().await.unwrap();

    let mut record = Record::new();
    for expected in 0..5i64 {
        let offset = session.next_decoded(&mut record).await.unwrap().unwrap();
        assert_eq!(offset, Offset(expected));
        assert_eq!(record.get("id").unwrap().as_i64(), Some(expected));
    }
    assert_eq!(session.current_offset().unwrap(), Offset(4));
    session.commit().await.unwrap();
    session.shutdown().await.unwrap();

    // A fresh session seeked to the committed offset re-reads that record.
    let committed = consume::load_checkpoint(&config).await.unwrap().unwrap();
    assert_eq!(committed, Offset(4));

    let factory = registry.resolve(&config, &schema).unwrap();
    let mut replay = factory.create_consumer().unwrap();
    replay
        .init(&config, Arc::new(NullMetricsSink))
        .await
        .unwrap();
    replay.start().await.unwrap();
    replay.set_offset(committed).unwrap();
    let offset = replay.next_decoded(&mut record).await.unwrap().unwrap();
    assert_eq!(offset, Offset(4));
    assert_eq!(record.get("message").unwrap().as_str(), Some("event-4"));
    replay.shutdown().await.unwrap();

    memory::reset(stream);
}

#[tokio::test]
async fn consume_run_then_resume_picks_up_after_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let stream = "e2e-consume-resume";
    publish_events(stream, 5);

    let registry = builtin_registry();
    let config = memory_config(stream, dir.path());
    let schema = event_schema();

    let first = consume::run(
        &registry,
        &config,
        &schema,
        &ConsumeOpts {
            max_records: Some(3),
            commit_every: Some(3),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.records, 3);
    assert_eq!(first.last_offset, Some(Offset(2)));

    // The resumed run starts just past the committed offset and drains
    // the remaining two records.
    let second = consume::run(
        &registry,
        &config,
        &schema,
        &ConsumeOpts {
            commit_every: Some(1),
            resume: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.records, 2);
    assert_eq!(second.last_offset, Some(Offset(4)));
    assert_eq!(
        consume::load_checkpoint(&config).await.unwrap(),
        Some(Offset(4))
    );

    memory::reset(stream);
}

#[tokio::test]
async fn consume_run_from_explicit_offset_ignores_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let stream = "e2e-consume-from-offset";
    publish_events(stream, 4);

    let registry = builtin_registry();
    let config = memory_config(stream, dir.path());
    let schema = event_schema();

    let summary = consume::run(
        &registry,
        &config,
        &schema,
        &ConsumeOpts {
            from_offset: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.last_offset, Some(Offset(3)));

    memory::reset(stream);
}

#[tokio::test]
async fn consume_run_rejects_unknown_plugin() {
    let registry = builtin_registry();
    let config = StreamConfig::new("kafka", "e2e-unknown-plugin", 0);
    let schema = event_schema();

    let err = consume::run(&registry, &config, &schema, &ConsumeOpts::default())
        .await
        .unwrap_err();
    let consumer_err = err.downcast_ref::<ingest_core::ConsumerError>().unwrap();
    assert!(matches!(
        consumer_err,
        ingest_core::ConsumerError::UnknownPlugin(id) if id == "kafka"
    ));
}

#[tokio::test]
async fn consume_run_reads_jsonl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut body = String::new();
    for i in 0..3 {
        body.push_str(&json!({"id": i, "message": format!("line-{i}")}).to_string());
        body.push('\n');
    }
    std::fs::write(&path, body).unwrap();

    let registry = builtin_registry();
    let mut config = StreamConfig::new("jsonl", "file-events", 0)
        .with_param("path", path.to_string_lossy());
    config.fetch_timeout_ms = 50;
    let schema = event_schema();

    let summary = consume::run(&registry, &config, &schema, &ConsumeOpts::default())
        .await
        .unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.last_offset, Some(Offset(2)));
}
