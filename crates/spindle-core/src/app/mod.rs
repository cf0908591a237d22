//! App - アプリケーション層
//!
//! ports を組み合わせて attempt の実行を組み立てる。
//!
//! # 主要コンポーネント
//! - **RunnerBuilder**: Runner の構築とワイヤリング（起動時検証つき）
//! - **Runner**: 1 attempt を Created から終端状態まで進める
//! - **WorkerGroup**: N 個のワーカーで attempt を並列に実行
//! - **CancelHandle / CancelSignal**: フェーズ境界で見る協調的キャンセル

pub mod builder;
pub mod cancel;
pub mod runner;
pub mod worker;

pub use self::builder::{BuildError, RunnerBuilder};
pub use self::cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use self::runner::Runner;
pub use self::worker::WorkerGroup;
