//! DryRunGateway - 何もせず成功を返す gateway

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use ulid::Ulid;

use crate::domain::{ExternalResult, SessionOptions};
use crate::error::GatewayError;
use crate::gateway::GatewayCall;
use crate::ports::{Connection, Gateway, GatewaySession};

/// 呼び出しを INFO でログに出し、`dry_run_<ulid>` の job id と
/// 呼び出し引数をそのまま返す
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunGateway;

impl DryRunGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Gateway for DryRunGateway {
    async fn connect(
        &self,
        connection: &Connection,
        options: SessionOptions,
    ) -> Result<Box<dyn GatewaySession>, GatewayError> {
        Ok(Box::new(DryRunSession {
            conn_id: connection.conn_id.clone(),
            project_id: connection.project_id.clone(),
            options,
        }))
    }
}

struct DryRunSession {
    conn_id: String,
    project_id: Option<String>,
    options: SessionOptions,
}

#[async_trait]
impl GatewaySession for DryRunSession {
    async fn execute(&mut self, call: GatewayCall) -> Result<ExternalResult, GatewayError> {
        let arguments = call.arguments();
        info!(
            conn_id = %self.conn_id,
            project_id = self.project_id.as_deref().unwrap_or("-"),
            use_legacy_sql = self.options.use_legacy_sql,
            method = call.method(),
            arguments = %serde_json::Value::Object(arguments.clone()),
            "dry run"
        );
        Ok(ExternalResult::with_job_id(format!("dry_run_{}", Ulid::new()))
            .with_body(Value::Object(arguments)))
    }
}
