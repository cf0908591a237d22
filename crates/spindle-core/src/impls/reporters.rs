//! Reporter の実装

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::{
    AttemptId, ExecutionAttempt, Failure, OperationKind, OutcomeKind, RunId,
};
use crate::ports::Reporter;

/// 終了した attempt のシリアライズ可能なビュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub attempt_id: AttemptId,
    pub run_id: RunId,
    pub task_id: String,
    pub kind: OperationKind,
    pub conn_id: String,
    pub outcome: OutcomeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,

    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AttemptReport {
    /// attempt が終わっていなければ `None`
    pub fn from_attempt(attempt: &ExecutionAttempt) -> Option<Self> {
        let outcome = attempt.outcome_kind()?;
        let spec = attempt.spec();
        Some(Self {
            attempt_id: attempt.attempt_id(),
            run_id: attempt.context().run_id,
            task_id: spec.task_id().to_string(),
            kind: spec.kind(),
            conn_id: spec.conn_id().to_string(),
            outcome,
            job_id: attempt.result().and_then(|r| r.job_id.clone()),
            failure: attempt.failure().cloned(),
            created_at: attempt.created_at(),
            finished_at: attempt.finished_at(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub succeeded: usize,
    pub failed: usize,
}

impl ReportCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// 終了した attempt ごとに構造化ログを 1 行出す
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, attempt: &ExecutionAttempt) {
        let spec = attempt.spec();
        match (attempt.outcome_kind(), attempt.failure()) {
            (Some(OutcomeKind::Succeeded), _) => info!(
                attempt_id = %attempt.attempt_id(),
                task_id = spec.task_id(),
                kind = %spec.kind(),
                job_id = ?attempt.result().and_then(|r| r.job_id.as_deref()),
                "attempt succeeded"
            ),
            (Some(OutcomeKind::Failed), failure) => error!(
                attempt_id = %attempt.attempt_id(),
                task_id = spec.task_id(),
                kind = %spec.kind(),
                error_kind = ?failure.map(|f| f.kind),
                message = failure.map(|f| f.message.as_str()).unwrap_or(""),
                "attempt failed"
            ),
            (None, _) => warn!(
                attempt_id = %attempt.attempt_id(),
                state = ?attempt.state(),
                "reported attempt is not terminal"
            ),
        }
    }
}

/// 届いた順にメモリに保持する
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<AttemptReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<AttemptReport> {
        self.lock().clone()
    }

    pub fn counts(&self) -> ReportCounts {
        self.lock()
            .iter()
            .fold(ReportCounts::default(), |mut counts, report| {
                match report.outcome {
                    OutcomeKind::Succeeded => counts.succeeded += 1,
                    OutcomeKind::Failed => counts.failed += 1,
                }
                counts
            })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AttemptReport>> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, attempt: &ExecutionAttempt) {
        match AttemptReport::from_attempt(attempt) {
            Some(report) => self.lock().push(report),
            None => warn!(
                attempt_id = %attempt.attempt_id(),
                state = ?attempt.state(),
                "ignoring report for non-terminal attempt"
            ),
        }
    }
}
