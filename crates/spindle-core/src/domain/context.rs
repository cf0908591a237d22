//! ExecutionContext - テンプレート解決で使う実行時の値

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use super::ids::RunId;

/// 実行ごとに外部スケジューラから渡される
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub run_id: RunId,
    pub execution_date: DateTime<Utc>,

    /// 上流タスクの出力（task id がキー）
    #[serde(default)]
    pub upstream_outputs: BTreeMap<String, Value>,

    /// ユーザー定義のテンプレート変数（`{{ params.name }}`）
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(run_id: RunId, execution_date: DateTime<Utc>) -> Self {
        Self {
            run_id,
            execution_date,
            upstream_outputs: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }

    /// 新しい run id を持つコンテキスト
    pub fn for_date(execution_date: DateTime<Utc>) -> Self {
        Self::new(RunId::from_ulid(Ulid::new()), execution_date)
    }

    pub fn with_upstream(mut self, task_id: impl Into<String>, output: Value) -> Self {
        self.upstream_outputs.insert(task_id.into(), output);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn builders_accumulate_values() {
        let date = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let ctx = ExecutionContext::for_date(date)
            .with_upstream("extract", json!("gs://bucket/out.csv"))
            .with_param("env", json!("prod"));

        assert_eq!(ctx.execution_date, date);
        assert_eq!(ctx.upstream_outputs["extract"], json!("gs://bucket/out.csv"));
        assert_eq!(ctx.params["env"], json!("prod"));
    }

    #[test]
    fn context_without_maps_deserializes() {
        let json = r#"{ "run_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV", "execution_date": "2015-01-01T00:00:00Z" }"#;
        let ctx: ExecutionContext = serde_json::from_str(json).expect("deserialize");
        assert!(ctx.upstream_outputs.is_empty());
        assert!(ctx.params.is_empty());
    }
}
