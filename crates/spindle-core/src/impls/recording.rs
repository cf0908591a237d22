//! RecordingGateway - 呼び出しを記録する gateway スタブ

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::domain::{ExternalResult, SessionOptions};
use crate::error::GatewayError;
use crate::gateway::GatewayCall;
use crate::ports::{Connection, Gateway, GatewaySession};

/// gateway から見た呼び出し 1 回分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub conn_id: String,
    pub options: SessionOptions,
    pub call: GatewayCall,
}

#[derive(Debug, Clone)]
enum Behaviour {
    Succeed,
    FailCall(String),
    RefuseConnect(String),
}

#[derive(Debug, Default)]
struct Recording {
    connects: usize,
    calls: Vec<RecordedCall>,
}

/// セッションと呼び出しを全部記録し、`job_<n>` の id を返す
///
/// clone は同じ記録を共有する
#[derive(Debug, Clone)]
pub struct RecordingGateway {
    recording: Arc<Mutex<Recording>>,
    behaviour: Behaviour,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Succeed)
    }

    /// 呼び出しは全部 `message` 付きの `GatewayError::Call` で失敗する
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behaviour(Behaviour::FailCall(message.into()))
    }

    /// connect が全部失敗する。呼び出しは記録されない
    pub fn refusing(message: impl Into<String>) -> Self {
        Self::with_behaviour(Behaviour::RefuseConnect(message.into()))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            recording: Arc::new(Mutex::new(Recording::default())),
            behaviour,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.recording).calls.clone()
    }

    pub fn connect_count(&self) -> usize {
        lock(&self.recording).connects
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

// poison は無視する（記録だけなので中身は壊れない）
fn lock(recording: &Mutex<Recording>) -> MutexGuard<'_, Recording> {
    recording.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn connect(
        &self,
        connection: &Connection,
        options: SessionOptions,
    ) -> Result<Box<dyn GatewaySession>, GatewayError> {
        if let Behaviour::RefuseConnect(message) = &self.behaviour {
            return Err(GatewayError::Connect {
                conn_id: connection.conn_id.clone(),
                message: message.clone(),
            });
        }
        lock(&self.recording).connects += 1;
        Ok(Box::new(RecordingSession {
            recording: Arc::clone(&self.recording),
            behaviour: self.behaviour.clone(),
            conn_id: connection.conn_id.clone(),
            options,
        }))
    }
}

struct RecordingSession {
    recording: Arc<Mutex<Recording>>,
    behaviour: Behaviour,
    conn_id: String,
    options: SessionOptions,
}

#[async_trait]
impl GatewaySession for RecordingSession {
    async fn execute(&mut self, call: GatewayCall) -> Result<ExternalResult, GatewayError> {
        let method = call.method();
        let n = {
            let mut recording = lock(&self.recording);
            recording.calls.push(RecordedCall {
                conn_id: self.conn_id.clone(),
                options: self.options,
                call,
            });
            recording.calls.len()
        };

        match &self.behaviour {
            Behaviour::FailCall(message) => Err(GatewayError::call(method, message.clone())),
            _ => Ok(ExternalResult::with_job_id(format!("job_{n}")).with_body(json!({ "method": method }))),
        }
    }
}
