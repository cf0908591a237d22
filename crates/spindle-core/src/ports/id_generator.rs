//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース。timestamp 部分は Clock から取る

use crate::domain::ids::{AttemptId, RunId};
use crate::ports::Clock;
use ulid::Ulid;

/// どのワーカーでも調整なしに生成できる ID
pub trait IdGenerator: Send + Sync {
    fn generate_attempt_id(&self) -> AttemptId;

    fn generate_run_id(&self) -> RunId;
}

/// ULID ベースの生成器。時刻部分は `C` から取る
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_attempt_id(&self) -> AttemptId {
        AttemptId::from(self.next_ulid())
    }

    fn generate_run_id(&self) -> RunId {
        RunId::from(self.next_ulid())
    }
}
