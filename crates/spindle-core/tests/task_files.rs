mod common;

use std::io::Write;
use std::sync::Arc;

use common::*;
use serde_json::json;
use spindle_core::config::{ConnectionRegistry, SpindleConfig, TaskFile};
use spindle_core::domain::AttemptState;
use spindle_core::impls::{MemoryReporter, RecordingGateway};
use spindle_core::{RunnerBuilder, WorkerGroup};

const TASKS: &str = r#"
tasks:
  - task_id: stage_events
    kind: create_external_table
    params:
      bucket: raw-events
      source_objects: ["{{ ds_nodash }}/*.csv"]
      destination_project_dataset_table: staging.events_{{ ds_nodash }}
  - task_id: load_events
    kind: run_query
    params:
      bql: "SELECT * FROM {{ upstream.stage_events }}"
      bigquery_conn_id: analytics
      use_legacy_sql: false
  - task_id: drop_scratch
    kind: delete_dataset
    params:
      dataset_id: scratch_{{ ds_nodash }}
"#;

const SETTINGS: &str = r#"
workers: 2
connections:
  - conn_id: analytics
    project_id: acme-analytics
"#;

#[tokio::test]
async fn task_file_runs_through_worker_group() {
    let mut tasks = tempfile::NamedTempFile::new().unwrap();
    tasks.write_all(TASKS.as_bytes()).unwrap();
    let specs = TaskFile::load(tasks.path()).unwrap().into_specs().unwrap();
    assert_eq!(specs[1].diagnostics().len(), 1);

    let settings = SpindleConfig::from_yaml_str(SETTINGS).unwrap();
    let gateway = RecordingGateway::new();
    let reporter = Arc::new(MemoryReporter::new());
    let runner = RunnerBuilder::new(Arc::new(gateway.clone()))
        .resolver(Arc::new(ConnectionRegistry::from_config(&settings).unwrap()))
        .reporter(reporter.clone())
        .expect_connections(specs.iter().map(|s| s.conn_id().to_string()))
        .build()
        .unwrap();
    let runner = Arc::new(runner);

    let ctx = Arc::new(
        runner
            .new_context(default_date())
            .with_upstream("stage_events", json!("staging.events_20150101")),
    );
    let mut group = WorkerGroup::spawn(settings.workers, Arc::clone(&runner));
    for spec in specs {
        group.submit(runner.new_attempt(Arc::new(spec), Arc::clone(&ctx))).unwrap();
    }
    let finished = group.finish().await;

    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|a| a.state() == AttemptState::Succeeded));
    assert_eq!(reporter.counts().succeeded, 3);

    let mut calls = gateway.calls();
    calls.sort_by_key(|c| c.call.method());
    let methods: Vec<_> = calls.iter().map(|c| c.call.method()).collect();
    assert_eq!(methods, vec!["create_external_table", "delete_dataset", "run_query"]);

    let external = calls[0].call.arguments();
    assert_eq!(external["source_uris"], json!(["gs://raw-events/20150101/*.csv"]));
    assert_eq!(calls[1].call.arguments()["dataset_id"], json!("scratch_20150101"));

    let query = &calls[2];
    assert_eq!(query.conn_id, "analytics");
    assert!(!query.options.use_legacy_sql);
    assert_eq!(query.call.arguments()["sql"], json!("SELECT * FROM staging.events_20150101"));
}

#[test]
fn unknown_connection_fails_fast_at_build() {
    let specs = TaskFile::from_yaml_str(TASKS).unwrap().into_specs().unwrap();
    let result = RunnerBuilder::new(Arc::new(RecordingGateway::new()))
        .expect_connections(specs.iter().map(|s| s.conn_id().to_string()))
        .build();
    assert!(result.is_err());
}
