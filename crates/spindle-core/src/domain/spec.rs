//! TaskSpec - タスク定義
//!
//! # 学習ポイント
//! - 検証は構築時の 1 回だけ。以後は変更しない（attempt 間で `Arc` 共有）
//! - `bigquery_conn_id` / `use_legacy_sql` はパラメータから外してフィールドに持ち上げる
//! - 旧名 `bql` は `sql` の別名として受け付け、`Diagnostic` を残す

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::kind::OperationKind;
use super::params::{Params, ParamType, value_kind};
use crate::error::ValidationError;

/// タスクが connection を指定しないときに使う id
pub const DEFAULT_CONN_ID: &str = "bigquery_default";

const CONN_ID_PARAM: &str = "bigquery_conn_id";
const LEGACY_SQL_PARAM: &str = "use_legacy_sql";
const DEPRECATED_SQL_PARAM: &str = "bql";
const SQL_PARAM: &str = "sql";

/// 構築時に見つかった致命的でない指摘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// 廃止済みのパラメータ名を後継の別名として受け付けた
    DeprecatedParameter {
        task_id: String,
        name: String,
        replacement: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DeprecatedParameter {
                task_id,
                name,
                replacement,
            } => write!(
                f,
                "Deprecated parameter `{name}` used in task `{task_id}`. \
                 Use `{replacement}` parameter instead. \
                 `{name}` will be removed in a future version."
            ),
        }
    }
}

/// 呼び出しではなく、gateway がセッションを開くときに使うオプション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub use_legacy_sql: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_legacy_sql: true,
        }
    }
}

/// 1 単位の仕事を表す不変の記述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    task_id: String,
    kind: OperationKind,
    conn_id: String,
    session: SessionOptions,
    params: Params,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

impl TaskSpec {
    /// `params` を `kind` に照らして検証し、kind ごとのデフォルトを埋める
    ///
    /// 結果のパラメータは kind が宣言したものちょうど。テンプレート文字列は
    /// そのまま残し、attempt ごとに解決する
    pub fn build(
        task_id: impl Into<String>,
        kind: OperationKind,
        params: Params,
    ) -> Result<Self, ValidationError> {
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }

        let mut raw = params;
        let mut diagnostics = Vec::new();

        let conn_id = match raw.remove(CONN_ID_PARAM) {
            None | Some(Value::Null) => DEFAULT_CONN_ID.to_string(),
            Some(Value::String(conn_id)) => conn_id,
            Some(other) => {
                return Err(invalid_type(&task_id, kind, CONN_ID_PARAM, &ParamType::Str, &other));
            }
        };

        let mut session = SessionOptions::default();
        if kind.accepts_session_options() {
            match raw.remove(LEGACY_SQL_PARAM) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(flag)) => session.use_legacy_sql = flag,
                Some(other) => {
                    return Err(invalid_type(
                        &task_id,
                        kind,
                        LEGACY_SQL_PARAM,
                        &ParamType::Bool,
                        &other,
                    ));
                }
            }
        }

        if kind == OperationKind::RunQuery
            && let Some(bql) = raw.remove(DEPRECATED_SQL_PARAM)
        {
            if raw.contains_key(SQL_PARAM) {
                return Err(ValidationError::ConflictingParameters {
                    task_id,
                    first: DEPRECATED_SQL_PARAM,
                    second: SQL_PARAM,
                });
            }
            let diagnostic = Diagnostic::DeprecatedParameter {
                task_id: task_id.clone(),
                name: DEPRECATED_SQL_PARAM.to_string(),
                replacement: SQL_PARAM.to_string(),
            };
            warn!(task_id = %task_id, "{diagnostic}");
            diagnostics.push(diagnostic);
            raw.insert(SQL_PARAM.to_string(), bql);
        }

        let mut resolved = Params::new();
        for def in kind.param_defs() {
            let value = match raw.remove(def.name) {
                Some(Value::Null) if def.is_required() => None,
                Some(value) => Some(value),
                None => def.default.to_value(),
            };
            let Some(value) = value else {
                return Err(ValidationError::MissingParameter {
                    task_id,
                    kind,
                    name: def.name,
                });
            };
            if !def.ty.accepts(&value) {
                return Err(invalid_type(&task_id, kind, def.name, &def.ty, &value));
            }
            resolved.insert(def.name.to_string(), value);
        }

        if let Some(name) = raw.into_keys().next() {
            return Err(ValidationError::UnknownParameter {
                task_id,
                kind,
                name,
            });
        }

        Ok(Self {
            task_id,
            kind,
            conn_id,
            session,
            params: resolved,
            diagnostics,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn session(&self) -> SessionOptions {
        self.session
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn invalid_type(
    task_id: &str,
    kind: OperationKind,
    name: &str,
    expected: &ParamType,
    found: &Value,
) -> ValidationError {
    ValidationError::InvalidType {
        task_id: task_id.to_string(),
        kind,
        name: name.to_string(),
        expected: expected.to_string(),
        found: value_kind(found),
    }
}
