//! config - タスクファイル、設定ファイル `spindle.yaml`、そこから作る connection レジストリ
//!
//! # 学習ポイント
//! - 読み込み時にすべて検証する（実行途中で設定エラーを出さない）
//! - YAML のエラーにはファイルパスを付ける

mod connections;
mod error;
mod tasks;

pub use self::connections::{ConnectionRegistry, SpindleConfig};
pub use self::error::ConfigError;
pub use self::tasks::{TaskDefinition, TaskFile};

use std::path::Path;

use serde::de::DeserializeOwned;

/// YAML ファイルを 1 つ読んでパースする
pub(crate) fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFile {
        path: path.to_path_buf(),
        source,
    })
}
