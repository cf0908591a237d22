//! Gateway port - 外部 warehouse クライアントとの境界
//!
//! core が依存するのはこの 2 つの trait だけ。
//!
//! # 契約
//! - 1 attempt につきセッションを 1 つ開き、呼び出しは 1 回
//! - リトライやキャッシュ、冪等性は trait の向こう側の実装が持つ

use async_trait::async_trait;

use crate::domain::{ExternalResult, SessionOptions};
use crate::error::GatewayError;
use crate::gateway::GatewayCall;
use crate::ports::Connection;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// `connection` 上にセッション（接続 + カーソル）を開く
    async fn connect(
        &self,
        connection: &Connection,
        options: SessionOptions,
    ) -> Result<Box<dyn GatewaySession>, GatewayError>;
}

#[async_trait]
pub trait GatewaySession: Send {
    /// クライアント呼び出しを 1 回行い、生の結果を返す
    async fn execute(&mut self, call: GatewayCall) -> Result<ExternalResult, GatewayError>;
}
