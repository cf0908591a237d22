//! Runner - 1 attempt を端から端まで実行する
//!
//! Created → Resolved → Dispatched → Succeeded/Failed。
//! 各フェーズの前に cancel を確認し、途中の gateway 呼び出しは中断しない。
//!
//! # 学習ポイント
//! - gateway への呼び出しは Dispatched に進む前に組み立てる
//!   （組み立てに失敗したら Resolved から Failed へ、gateway には触れない）
//! - 成否の最終ログは Reporter の仕事。ここでは debug! に留める

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::cancel::CancelSignal;
use crate::domain::{AttemptState, ExecutionAttempt, ExecutionContext, ExternalResult, TaskSpec};
use crate::error::SpindleError;
use crate::gateway::{Dispatcher, GatewayCall};
use crate::ports::{Clock, ConnectionResolver, IdGenerator, Reporter};
use crate::template::TemplateEngine;

pub struct Runner {
    pub(super) dispatcher: Dispatcher,
    pub(super) resolver: Arc<dyn ConnectionResolver>,
    pub(super) reporter: Arc<dyn Reporter>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) templates: TemplateEngine,
}

impl Runner {
    /// Created 状態の新しい attempt
    pub fn new_attempt(
        &self,
        spec: Arc<TaskSpec>,
        context: Arc<ExecutionContext>,
    ) -> ExecutionAttempt {
        ExecutionAttempt::new(self.ids.generate_attempt_id(), spec, context, self.clock.now())
    }

    /// run id を採番した `execution_date` のコンテキスト
    pub fn new_context(&self, execution_date: DateTime<Utc>) -> ExecutionContext {
        ExecutionContext::new(self.ids.generate_run_id(), execution_date)
    }

    pub async fn execute(
        &self,
        attempt: &mut ExecutionAttempt,
    ) -> Result<ExternalResult, SpindleError> {
        self.execute_cancellable(attempt, &CancelSignal::never()).await
    }

    /// `attempt` を終端状態まで進める
    ///
    /// - 失敗したら attempt は `Failed`、元のエラーをそのまま返す
    /// - Reporter にはちょうど 1 回だけ渡す
    /// - 開始済みの attempt は触らずに拒否する
    pub async fn execute_cancellable(
        &self,
        attempt: &mut ExecutionAttempt,
        cancel: &CancelSignal,
    ) -> Result<ExternalResult, SpindleError> {
        if attempt.state() != AttemptState::Created {
            return Err(SpindleError::InvalidTransition {
                from: attempt.state(),
                to: AttemptState::Resolved,
            });
        }

        let outcome = self.drive(attempt, cancel).await;
        if let Err(err) = &outcome {
            self.record_failure(attempt, err);
        }
        self.reporter.report(attempt);
        outcome
    }

    /// 実行されない attempt を cancelled として失敗させ、報告する
    pub fn cancel(&self, attempt: &mut ExecutionAttempt) -> SpindleError {
        let err = SpindleError::Cancelled {
            phase: phase_after(attempt.state()),
        };
        self.abandon(attempt, err)
    }

    /// 終端に届かなかった attempt を `err` で失敗させて報告する。終端済みなら何もしない
    pub(super) fn abandon(&self, attempt: &mut ExecutionAttempt, err: SpindleError) -> SpindleError {
        if !attempt.state().is_terminal() {
            self.record_failure(attempt, &err);
            self.reporter.report(attempt);
        }
        err
    }

    async fn drive(
        &self,
        attempt: &mut ExecutionAttempt,
        cancel: &CancelSignal,
    ) -> Result<ExternalResult, SpindleError> {
        let spec = attempt.shared_spec();
        let context = attempt.shared_context();
        let attempt_id = attempt.attempt_id();

        check_cancel(cancel, "resolution")?;
        debug!(%attempt_id, task_id = spec.task_id(), "resolving parameters");
        let resolved = self.templates.resolve(&spec, &context)?;
        attempt.mark_resolved(resolved.clone(), self.clock.now())?;

        check_cancel(cancel, "dispatch")?;
        let call = GatewayCall::from_resolved(spec.kind(), &resolved)?;
        let connection = self.resolver.resolve(spec.conn_id())?;
        attempt.mark_dispatched(self.clock.now())?;
        debug!(%attempt_id, method = call.method(), conn_id = spec.conn_id(), "dispatching");

        let result = self
            .dispatcher
            .send(call, &connection, spec.session())
            .await?;
        attempt.succeed(result.clone(), self.clock.now())?;

        debug!(%attempt_id, task_id = spec.task_id(), job_id = ?result.job_id, "attempt succeeded");
        Ok(result)
    }

    fn record_failure(&self, attempt: &mut ExecutionAttempt, err: &SpindleError) {
        debug!(
            attempt_id = %attempt.attempt_id(),
            task_id = attempt.spec().task_id(),
            state = ?attempt.state(),
            error = %err,
            "attempt failed"
        );
        if let Err(e) = attempt.fail(err, self.clock.now()) {
            error!(attempt_id = %attempt.attempt_id(), error = %e, "could not mark attempt failed");
        }
    }
}

fn check_cancel(cancel: &CancelSignal, phase: &'static str) -> Result<(), SpindleError> {
    if cancel.is_cancelled() {
        return Err(SpindleError::Cancelled { phase });
    }
    Ok(())
}

fn phase_after(state: AttemptState) -> &'static str {
    match state {
        AttemptState::Created => "resolution",
        AttemptState::Resolved => "dispatch",
        _ => "completion",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{CancelHandle, RunnerBuilder, cancel_pair};
    use crate::config::{ConfigError, ConnectionRegistry};
    use crate::domain::{OperationKind, OutcomeKind, Params};
    use crate::error::{ErrorKind, TemplateError};
    use crate::impls::{MemoryReporter, RecordingGateway};
    use crate::ports::{Connection, FixedClock, SystemClock, UlidGenerator};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()
    }

    struct Fixture {
        runner: Runner,
        gateway: RecordingGateway,
        reporter: Arc<MemoryReporter>,
    }

    fn fixture(gateway: RecordingGateway) -> Fixture {
        let reporter = Arc::new(MemoryReporter::new());
        let registry =
            ConnectionRegistry::new(vec![Connection::new("analytics").with_project("acme")])
                .unwrap();
        let runner = RunnerBuilder::new(Arc::new(gateway.clone()))
            .resolver(Arc::new(registry))
            .reporter(reporter.clone())
            .clock(Arc::new(FixedClock::new(date())))
            .build()
            .unwrap();
        Fixture {
            runner,
            gateway,
            reporter,
        }
    }

    fn spec(raw: serde_json::Value) -> Arc<TaskSpec> {
        let params: Params = serde_json::from_value(raw).unwrap();
        Arc::new(TaskSpec::build("q", OperationKind::RunQuery, params).unwrap())
    }

    #[tokio::test]
    async fn success_walks_every_phase_and_reports_once() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f
            .runner
            .new_attempt(spec(json!({ "sql": "SELECT '{{ ds }}'" })), ctx);

        let result = f.runner.execute(&mut attempt).await.unwrap();

        assert_eq!(result.job_id.as_deref(), Some("job_1"));
        assert_eq!(attempt.state(), AttemptState::Succeeded);
        assert_eq!(attempt.transitions().len(), 3);
        assert_eq!(attempt.resolved().unwrap().get("sql"), Some(&json!("SELECT '2015-01-01'")));
        assert_eq!(f.reporter.counts().succeeded, 1);
        assert_eq!(f.gateway.calls()[0].conn_id, "bigquery_default");
    }

    #[tokio::test]
    async fn gateway_failure_fails_the_attempt() {
        let f = fixture(RecordingGateway::failing("quota exceeded"));
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);

        let err = f.runner.execute(&mut attempt).await.unwrap_err();

        assert!(matches!(err, SpindleError::Gateway(_)));
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(attempt.failure().unwrap().kind, ErrorKind::Gateway);
        assert_eq!(attempt.failure().unwrap().message, "run_query failed: quota exceeded");
        assert_eq!(f.reporter.reports()[0].outcome, OutcomeKind::Failed);
    }

    #[tokio::test]
    async fn template_failure_never_reaches_the_gateway() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f
            .runner
            .new_attempt(spec(json!({ "sql": "SELECT {{ upstream.nope }}" })), ctx);

        let err = f.runner.execute(&mut attempt).await.unwrap_err();

        assert!(matches!(err, SpindleError::Template(TemplateError::Unresolvable { .. })));
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(attempt.transitions().len(), 1);
        assert_eq!(f.gateway.connect_count(), 0);
    }

    #[tokio::test]
    async fn unknown_connection_fails_after_resolution() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(
            spec(json!({ "sql": "SELECT 1", "bigquery_conn_id": "missing" })),
            ctx,
        );

        let err = f.runner.execute(&mut attempt).await.unwrap_err();

        assert!(matches!(err, SpindleError::Config(ConfigError::UnknownConnection(_))));
        assert_eq!(attempt.failure().unwrap().kind, ErrorKind::Config);
        assert!(attempt.resolved().is_some());
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn named_connection_reaches_the_gateway() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(
            spec(json!({ "sql": "SELECT 1", "bigquery_conn_id": "analytics", "use_legacy_sql": false })),
            ctx,
        );

        f.runner.execute(&mut attempt).await.unwrap();

        let call = &f.gateway.calls()[0];
        assert_eq!(call.conn_id, "analytics");
        assert!(!call.options.use_legacy_sql);
    }

    #[tokio::test]
    async fn cancellation_before_start_leaves_gateway_untouched() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let err = f
            .runner
            .execute_cancellable(&mut attempt, &signal)
            .await
            .unwrap_err();

        assert!(matches!(err, SpindleError::Cancelled { phase: "resolution" }));
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(attempt.failure().unwrap().kind, ErrorKind::Cancelled);
        assert_eq!(f.gateway.connect_count(), 0);
        assert_eq!(f.reporter.counts().failed, 1);
    }

    /// arm() 後に時刻を読まれた瞬間に cancel する時計
    struct CancellingClock {
        armed: AtomicBool,
        handle: CancelHandle,
    }

    impl CancellingClock {
        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    impl Clock for CancellingClock {
        fn now(&self) -> DateTime<Utc> {
            if self.armed.load(Ordering::SeqCst) {
                self.handle.cancel();
            }
            date()
        }
    }

    #[tokio::test]
    async fn cancellation_after_resolution_stops_before_dispatch() {
        let gateway = RecordingGateway::new();
        let reporter = Arc::new(MemoryReporter::new());
        let (handle, signal) = cancel_pair();
        let clock = Arc::new(CancellingClock {
            armed: AtomicBool::new(false),
            handle,
        });
        let runner = RunnerBuilder::new(Arc::new(gateway.clone()))
            .reporter(reporter.clone())
            .clock(clock.clone())
            .ids(Arc::new(UlidGenerator::new(SystemClock)))
            .build()
            .unwrap();
        let ctx = Arc::new(runner.new_context(date()));
        let mut attempt = runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);

        // mark_resolved が時刻を読んだところで cancel が立つ
        clock.arm();
        let err = runner
            .execute_cancellable(&mut attempt, &signal)
            .await
            .unwrap_err();

        assert!(matches!(err, SpindleError::Cancelled { phase: "dispatch" }));
        assert_eq!(attempt.state(), AttemptState::Failed);
        let states: Vec<_> = attempt.transitions().iter().map(|t| t.to).collect();
        assert_eq!(states, vec![AttemptState::Resolved, AttemptState::Failed]);
        assert!(attempt.resolved().is_some());
        assert_eq!(gateway.connect_count(), 0);
        assert_eq!(reporter.counts().failed, 1);
    }

    #[tokio::test]
    async fn abandon_fails_unfinished_attempt_with_the_given_error() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);

        f.runner.abandon(&mut attempt, SpindleError::Panicked { message: "boom".to_string() });

        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(attempt.failure().unwrap().kind, ErrorKind::Internal);
        assert_eq!(f.reporter.reports().len(), 1);
    }

    #[tokio::test]
    async fn finished_attempt_is_not_run_again() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);
        f.runner.execute(&mut attempt).await.unwrap();

        let err = f.runner.execute(&mut attempt).await.unwrap_err();

        assert!(matches!(err, SpindleError::InvalidTransition { from: AttemptState::Succeeded, .. }));
        assert_eq!(attempt.state(), AttemptState::Succeeded);
        assert_eq!(f.gateway.calls().len(), 1);
        assert_eq!(f.reporter.reports().len(), 1);
    }

    #[tokio::test]
    async fn cancel_fails_pending_attempt_once() {
        let f = fixture(RecordingGateway::new());
        let ctx = Arc::new(f.runner.new_context(date()));
        let mut attempt = f.runner.new_attempt(spec(json!({ "sql": "SELECT 1" })), ctx);

        let err = f.runner.cancel(&mut attempt);
        f.runner.cancel(&mut attempt);

        assert!(matches!(err, SpindleError::Cancelled { phase: "resolution" }));
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(f.reporter.reports().len(), 1);
    }
}
