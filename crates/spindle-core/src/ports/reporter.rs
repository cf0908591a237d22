//! Reporter port - 終了した attempt の記録
//!
//! attempt が終端状態に達した後、ちょうど 1 回呼ばれる。
//! 実装は attempt を観測するだけで、失敗させてはいけない

use crate::domain::ExecutionAttempt;

pub trait Reporter: Send + Sync {
    fn report(&self, attempt: &ExecutionAttempt);
}
