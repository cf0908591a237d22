//! Impls - ports の実装（開発用・テスト用）
//!
//! - **RecordingGateway**: 呼び出しを記録するだけの gateway（テスト用）
//! - **DryRunGateway**: 呼び出しをログに出して成功扱いにする gateway（CLI 用）
//! - **TracingReporter** / **MemoryReporter**: 終了した attempt の記録
//!
//! 本物のウェアハウス gateway はこの crate の外、`ports::Gateway` の向こう側にある

pub mod dry_run;
pub mod recording;
pub mod reporters;

pub use self::dry_run::DryRunGateway;
pub use self::recording::{RecordedCall, RecordingGateway};
pub use self::reporters::{AttemptReport, MemoryReporter, ReportCounts, TracingReporter};
