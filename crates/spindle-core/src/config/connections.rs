//! connections - 設定ファイル `spindle.yaml` と connection レジストリ

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConfigError, load_yaml};
use crate::domain::DEFAULT_CONN_ID;
use crate::ports::{Connection, ConnectionResolver};

/// 設定ファイル
///
/// ```yaml
/// workers: 4
/// connections:
///   - conn_id: analytics
///     project_id: acme-analytics
///     location: EU
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpindleConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub connections: Vec<Connection>,
}

fn default_workers() -> usize {
    1
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            connections: Vec::new(),
        }
    }
}

impl SpindleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: SpindleConfig = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SpindleConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection id → `Connection`
///
/// `bigquery_default` は常にある。設定に無ければ空のものを登録する
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    connections: HashMap<String, Connection>,
}

impl ConnectionRegistry {
    pub fn new(connections: Vec<Connection>) -> Result<Self, ConfigError> {
        let mut map = HashMap::with_capacity(connections.len() + 1);
        for connection in connections {
            if map.contains_key(&connection.conn_id) {
                return Err(ConfigError::DuplicateConnection(connection.conn_id));
            }
            map.insert(connection.conn_id.clone(), connection);
        }
        map.entry(DEFAULT_CONN_ID.to_string())
            .or_insert_with(|| Connection::new(DEFAULT_CONN_ID));
        debug!(connections = map.len(), "connection registry ready");
        Ok(Self { connections: map })
    }

    pub fn from_config(config: &SpindleConfig) -> Result<Self, ConfigError> {
        Self::new(config.connections.clone())
    }

    pub fn get(&self, conn_id: &str) -> Option<&Connection> {
        self.connections.get(conn_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        let mut connections = HashMap::new();
        connections.insert(DEFAULT_CONN_ID.to_string(), Connection::new(DEFAULT_CONN_ID));
        Self { connections }
    }
}

impl ConnectionResolver for ConnectionRegistry {
    fn resolve(&self, conn_id: &str) -> Result<Connection, ConfigError> {
        self.connections
            .get(conn_id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownConnection(conn_id.to_string()))
    }
}
