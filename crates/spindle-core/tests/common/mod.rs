#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use spindle_core::domain::{ExecutionAttempt, ExternalResult, OperationKind, Params, TaskSpec};
use spindle_core::error::SpindleError;
use spindle_core::impls::{MemoryReporter, RecordingGateway};
use spindle_core::ports::FixedClock;
use spindle_core::{Runner, RunnerBuilder};

pub const TASK_ID: &str = "test-bq-create-table-operator";
pub const TEST_DATASET: &str = "test-dataset";
pub const TEST_GCP_PROJECT_ID: &str = "test-project";
pub const TEST_TABLE_ID: &str = "test-table-id";
pub const TEST_GCS_BUCKET: &str = "test-bucket";
pub const TEST_SOURCE_FORMAT: &str = "CSV";

pub fn default_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()
}

pub fn params(value: Value) -> Params {
    serde_json::from_value(value).unwrap()
}

pub struct Harness {
    pub runner: Runner,
    pub gateway: RecordingGateway,
    pub reporter: Arc<MemoryReporter>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(RecordingGateway::new())
    }

    pub fn with_gateway(gateway: RecordingGateway) -> Self {
        let reporter = Arc::new(MemoryReporter::new());
        let runner = RunnerBuilder::new(Arc::new(gateway.clone()))
            .reporter(reporter.clone())
            .clock(Arc::new(FixedClock::new(default_date())))
            .build()
            .unwrap();
        Self {
            runner,
            gateway,
            reporter,
        }
    }

    pub fn attempt(&self, spec: TaskSpec) -> ExecutionAttempt {
        let ctx = Arc::new(self.runner.new_context(default_date()));
        self.runner.new_attempt(Arc::new(spec), ctx)
    }

    /// Build, run and return the attempt plus the runner's answer.
    pub async fn run(
        &self,
        kind: OperationKind,
        raw: Value,
    ) -> (ExecutionAttempt, Result<ExternalResult, SpindleError>) {
        let spec = TaskSpec::build(TASK_ID, kind, params(raw)).unwrap();
        let mut attempt = self.attempt(spec);
        let result = self.runner.execute(&mut attempt).await;
        (attempt, result)
    }

    /// The only call made so far, as (method, arguments).
    pub fn single_call(&self) -> (&'static str, Map<String, Value>) {
        let calls = self.gateway.calls();
        assert_eq!(calls.len(), 1, "expected exactly one gateway call");
        (calls[0].call.method(), calls[0].call.arguments())
    }
}
