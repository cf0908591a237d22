//! spindle-core
//!
//! Core building blocks for running warehouse operations as scheduled tasks.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, kind, params, spec, context, attempt, outcome）
//! - **template**: パラメータ内の `{{ ... }}` を実行時の値で解決
//! - **gateway**: 型付きクライアント呼び出し（GatewayCall）と Dispatcher
//! - **ports**: 抽象化レイヤー（Gateway, ConnectionResolver, Reporter, Clock, IdGenerator）
//! - **app**: Runner / RunnerBuilder / WorkerGroup
//! - **impls**: ports の実装（RecordingGateway, DryRunGateway, reporters）
//! - **config**: タスクファイル・設定ファイル・ConnectionRegistry
//! - **error**: エラー型
//!
//! # 実行の流れ
//! 1. `TaskSpec::build()` で検証・デフォルト補完（一度だけ）
//! 2. `Runner::new_attempt()` で ExecutionContext と組み合わせて attempt を作る
//! 3. `Runner::execute()` で resolve → dispatch → report

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod impls;
pub mod ports;
pub mod template;

pub use crate::app::{Runner, RunnerBuilder, WorkerGroup};
pub use crate::domain::{ExecutionAttempt, ExecutionContext, OperationKind, TaskSpec};
pub use crate::error::SpindleError;
