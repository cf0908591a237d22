//! Error taxonomy.
//!
//! - `ValidationError`: bad or missing task parameters, detected before dispatch
//! - `TemplateError`: unresolvable placeholder
//! - `GatewayError`: the external call failed (never retried here)
//! - `ConfigError`: task files and connection registry
//!
//! `SpindleError` wraps them all so callers get the originating error back
//! unmodified.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{AttemptState, OperationKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task_id must not be empty")]
    EmptyTaskId,

    #[error("task `{task_id}` ({kind}): missing required parameter `{name}`")]
    MissingParameter {
        task_id: String,
        kind: OperationKind,
        name: &'static str,
    },

    #[error("task `{task_id}` ({kind}): parameter `{name}` expects {expected}, got {found}")]
    InvalidType {
        task_id: String,
        kind: OperationKind,
        name: String,
        expected: String,
        found: &'static str,
    },

    #[error("task `{task_id}` ({kind}): unknown parameter `{name}`")]
    UnknownParameter {
        task_id: String,
        kind: OperationKind,
        name: String,
    },

    #[error("task `{task_id}`: parameters `{first}` and `{second}` cannot both be set")]
    ConflictingParameters {
        task_id: String,
        first: &'static str,
        second: &'static str,
    },

    /// Resolved parameters did not map onto the client call.
    #[error("{kind}: cannot build client call: {message}")]
    MalformedCall {
        kind: OperationKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("parameter `{param}`: unresolvable template: {message}")]
    Unresolvable { param: String, message: String },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open session on connection `{conn_id}`: {message}")]
    Connect { conn_id: String, message: String },

    #[error("{method} failed: {message}")]
    Call {
        method: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GatewayError {
    pub fn call(method: &'static str, message: impl Into<String>) -> Self {
        GatewayError::Call {
            method,
            message: message.into(),
            source: None,
        }
    }

    pub fn call_with_source(
        method: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GatewayError::Call {
            method,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Failure classification recorded on a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Template,
    Gateway,
    Config,
    Cancelled,
    Internal,
}

#[derive(Debug, Error)]
pub enum SpindleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cancelled before {phase}")]
    Cancelled { phase: &'static str },

    #[error("invalid attempt transition {from:?} -> {to:?}")]
    InvalidTransition { from: AttemptState, to: AttemptState },

    #[error("worker group is shut down")]
    WorkerGroupClosed,

    /// 実行中に panic した（attempt は Failed として返る）
    #[error("attempt panicked: {message}")]
    Panicked { message: String },
}

impl SpindleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpindleError::Validation(_) => ErrorKind::Validation,
            SpindleError::Template(_) => ErrorKind::Template,
            SpindleError::Gateway(_) => ErrorKind::Gateway,
            SpindleError::Config(_) => ErrorKind::Config,
            SpindleError::Cancelled { .. } => ErrorKind::Cancelled,
            SpindleError::InvalidTransition { .. }
            | SpindleError::WorkerGroupClosed
            | SpindleError::Panicked { .. } => ErrorKind::Internal,
        }
    }
}
