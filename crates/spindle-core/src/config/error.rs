//! ConfigError - 設定まわりのエラー

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ValidationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("YAML parse error in '{path}': {source}")]
    YamlFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown connection `{0}`")]
    UnknownConnection(String),

    #[error("connection `{0}` is defined more than once")]
    DuplicateConnection(String),

    #[error("task `{0}` is defined more than once")]
    DuplicateTask(String),

    /// タスク定義の検証に失敗した
    #[error("invalid task definition: {0}")]
    InvalidTask(#[from] ValidationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
