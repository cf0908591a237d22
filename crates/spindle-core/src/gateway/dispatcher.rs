use std::sync::Arc;

use tracing::debug;

use super::calls::GatewayCall;
use crate::domain::{ExternalResult, OperationKind, ResolvedParams, SessionOptions};
use crate::error::SpindleError;
use crate::ports::{Connection, Gateway};

/// Dispatcher - 解決済みパラメータを 1 回の gateway 呼び出しに変換して送る
///
/// - 1 dispatch につきセッションは 1 つ
/// - ここではリトライしない（失敗はそのまま呼び出し元へ）
pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// `GatewayCall` を組み立ててから `send()` する
    pub async fn dispatch(
        &self,
        kind: OperationKind,
        connection: &Connection,
        options: SessionOptions,
        params: &ResolvedParams,
    ) -> Result<ExternalResult, SpindleError> {
        let call = GatewayCall::from_resolved(kind, params)?;
        self.send(call, connection, options).await
    }

    /// 組み立て済みの呼び出しを送る。セッションを開いて 1 回だけ実行する
    pub async fn send(
        &self,
        call: GatewayCall,
        connection: &Connection,
        options: SessionOptions,
    ) -> Result<ExternalResult, SpindleError> {
        let method = call.method();
        debug!(
            conn_id = %connection.conn_id,
            method,
            use_legacy_sql = options.use_legacy_sql,
            "dispatching gateway call"
        );

        let mut session = self.gateway.connect(connection, options).await?;
        let result = session.execute(call).await?;

        debug!(method, job_id = ?result.job_id, "gateway call returned");
        Ok(result)
    }
}
