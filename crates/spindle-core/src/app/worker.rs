//! WorkerGroup - attempt を複数ワーカーで並行実行する
//!
//! # 学習ポイント
//! - attempt は 1 つずつ別タスクで実行し、panic してもワーカーは生き残る
//! - 終わった attempt はその場で done チャネルへ送る（ワーカーの戻り値に溜めない）
//! - panic した attempt は Created の複製を `Panicked` で失敗させて返す

use std::any::Any;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use super::cancel::CancelSignal;
use super::runner::Runner;
use crate::domain::ExecutionAttempt;
use crate::error::SpindleError;

type Job = (usize, ExecutionAttempt);

/// Worker group handle.
/// - `submit()` で attempt を投入、空いているワーカーが 1 つずつ実行する
/// - `request_shutdown()` で新しい attempt を取らなくなる（実行中のものはフェーズ境界で止まる）
/// - `finish()` で全ワーカーの終了を待ち、投入順に attempt を返す
pub struct WorkerGroup {
    runner: Arc<Runner>,
    jobs_tx: mpsc::UnboundedSender<Job>,
    jobs_rx: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    done_rx: mpsc::UnboundedReceiver<Job>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    submitted: usize,
}

impl WorkerGroup {
    /// `n` 個（最低 1）のワーカーを起動する
    pub fn spawn(n: usize, runner: Arc<Runner>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let n = n.max(1);
        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let rx = Arc::clone(&jobs_rx);
            let rt = Arc::clone(&runner);
            let done = done_tx.clone();
            let mut shutdown = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, rx, rt, done, &mut shutdown).await
            });
            joins.push(join);
        }
        debug!(workers = n, "worker group started");

        Self {
            runner,
            jobs_tx,
            jobs_rx,
            done_rx,
            shutdown_tx,
            joins,
            submitted: 0,
        }
    }

    /// attempt をキューに積む。shutdown 要求後は `WorkerGroupClosed`
    pub fn submit(&mut self, attempt: ExecutionAttempt) -> Result<(), SpindleError> {
        if *self.shutdown_tx.borrow() {
            return Err(SpindleError::WorkerGroupClosed);
        }
        self.jobs_tx
            .send((self.submitted, attempt))
            .map_err(|_| SpindleError::WorkerGroupClosed)?;
        self.submitted += 1;
        Ok(())
    }

    /// 全ワーカーに shutdown を要求する
    /// 実行中の attempt は次のフェーズ境界で cancelled として失敗し、キュー中のものは開始されない
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// 全ワーカーの終了を待ち、投入した attempt をすべて投入順に返す
    /// どれも終端状態: shutdown 時にキューに残っていたものは cancelled で失敗している
    pub async fn finish(self) -> Vec<ExecutionAttempt> {
        let WorkerGroup {
            runner,
            jobs_tx,
            jobs_rx,
            mut done_rx,
            shutdown_tx,
            joins,
            submitted,
        } = self;

        // sender を落とすと、キューが空になった時点でワーカーが抜ける
        drop(jobs_tx);

        for join in joins {
            if let Err(e) = join.await {
                error!(error = %e, "worker task failed");
            }
        }

        let mut done = Vec::with_capacity(submitted);
        while let Ok(job) = done_rx.try_recv() {
            done.push(job);
        }

        let mut rx = jobs_rx.lock().await;
        while let Ok((seq, mut attempt)) = rx.try_recv() {
            runner.cancel(&mut attempt);
            done.push((seq, attempt));
        }
        drop(shutdown_tx);

        done.sort_by_key(|(seq, _)| *seq);
        done.into_iter().map(|(_, attempt)| attempt).collect()
    }
}

async fn worker_loop(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    runner: Arc<Runner>,
    done: mpsc::UnboundedSender<Job>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut ran = 0usize;
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        // recv は「待つ」可能性があるので select で shutdown と競合させる
        let next = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = async { jobs.lock().await.recv().await } => next,
        };

        // None = sender が drop され、キューも空
        let Some((seq, attempt)) = next else {
            break;
        };

        let cancel = CancelSignal::from(shutdown_rx.clone());
        let attempt = run_isolated(worker_id, &runner, attempt, cancel).await;
        ran += 1;
        if done.send((seq, attempt)).is_err() {
            break;
        }
    }
    debug!(worker_id, attempts = ran, "worker stopped");
}

/// attempt を別タスクで実行する。panic したら `Panicked` で失敗させる
async fn run_isolated(
    worker_id: usize,
    runner: &Arc<Runner>,
    attempt: ExecutionAttempt,
    cancel: CancelSignal,
) -> ExecutionAttempt {
    let fallback = attempt.clone();
    let rt = Arc::clone(runner);
    let task = tokio::spawn(async move {
        let mut attempt = attempt;
        if let Err(err) = rt.execute_cancellable(&mut attempt, &cancel).await {
            debug!(worker_id, attempt_id = %attempt.attempt_id(), error = %err, "attempt ended with error");
        }
        attempt
    });

    match task.await {
        Ok(attempt) => attempt,
        Err(e) => {
            let mut attempt = fallback;
            let message = panic_message(e);
            error!(worker_id, attempt_id = %attempt.attempt_id(), %message, "attempt panicked");
            runner.abandon(&mut attempt, SpindleError::Panicked { message });
            attempt
        }
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload_text(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn payload_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}
