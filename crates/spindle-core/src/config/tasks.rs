//! tasks - タスクファイル
//!
//! ```yaml
//! tasks:
//!   - task_id: load_events
//!     kind: run_query
//!     params:
//!       sql: "SELECT * FROM events WHERE day = '{{ ds }}'"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConfigError, load_yaml};
use crate::domain::{OperationKind, Params, TaskSpec};

/// タスクファイルに書かれたままのタスク 1 つ（検証前）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub params: Params,
}

impl TaskDefinition {
    pub fn build(self) -> Result<TaskSpec, ConfigError> {
        Ok(TaskSpec::build(self.task_id, self.kind, self.params)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

impl TaskFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file: TaskFile = load_yaml(path)?;
        debug!(path = %path.display(), tasks = file.tasks.len(), "loaded task file");
        Ok(file)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// 全定義を検証する。最初に不正なタスクで止まる
    pub fn into_specs(self) -> Result<Vec<TaskSpec>, ConfigError> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.tasks.len());
        for def in self.tasks {
            if !seen.insert(def.task_id.clone()) {
                return Err(ConfigError::DuplicateTask(def.task_id));
            }
            specs.push(def.build()?);
        }
        Ok(specs)
    }
}
