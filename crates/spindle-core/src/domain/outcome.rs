//! Outcome model: what an attempt ends with.
//!
//! An attempt either carries the gateway's raw `ExternalResult` or a
//! `Failure` snapshot of the error that stopped it. The error itself is
//! returned to the caller; the snapshot is what reports and logs keep.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SpindleError};

/// Raw result returned by the external client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResult {
    /// Identifier the service assigned to the operation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Whatever else the client returned.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ExternalResult {
    pub fn empty() -> Self {
        Self {
            job_id: None,
            body: serde_json::Value::Null,
        }
    }

    pub fn with_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            body: serde_json::Value::Null,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }
}

/// Terminal classification of an attempt.
///
/// Serialized as SUCCEEDED / FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Succeeded,
    Failed,
}

/// Snapshot of the error attached to a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SpindleError> for Failure {
    fn from(err: &SpindleError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
