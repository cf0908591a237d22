//! Connection port - connection id から接続情報への解決
//!
//! 認証情報は core の外で解決する。`Connection` が持つのはセッションを開くのに
//! 必要なものだけで、プロバイダ固有の値は `extra` に不透明なまま入れる

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub conn_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Connection {
    pub fn new(conn_id: impl Into<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            project_id: None,
            location: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// connection id を `Connection` に解決する
pub trait ConnectionResolver: Send + Sync {
    fn resolve(&self, conn_id: &str) -> Result<Connection, ConfigError>;
}
