//! calls - クライアントメソッドごとの呼び出し構造体
//!
//! # 学習ポイント
//! - フィールド順はクライアントのメソッドシグネチャに合わせる
//! - 省略可能な引数もスキップせず `null` で出す（`arguments()` は常に全キーワードを持つ）
//! - `deny_unknown_fields` で余計なキーはクライアントに届く前に弾く

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::domain::{OperationKind, ResolvedParams};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEmptyTableCall {
    pub dataset_id: String,
    pub project_id: Option<String>,
    pub table_id: String,
    pub schema_fields: Option<Vec<Value>>,
    pub time_partitioning: Map<String, Value>,
    pub labels: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExternalTableCall {
    pub external_project_dataset_table: String,
    pub schema_fields: Option<Vec<Value>>,
    pub source_uris: Vec<String>,
    pub source_format: String,
    pub compression: String,
    pub skip_leading_rows: i64,
    pub field_delimiter: String,
    pub max_bad_records: i64,
    pub quote_character: Option<String>,
    pub allow_quoted_newlines: bool,
    pub allow_jagged_rows: bool,
    pub src_fmt_configs: Map<String, Value>,
    pub labels: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteDatasetCall {
    pub dataset_id: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEmptyDatasetCall {
    pub dataset_id: String,
    pub project_id: Option<String>,
    pub dataset_reference: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunQueryCall {
    pub sql: String,
    pub destination_dataset_table: Option<String>,
    pub write_disposition: String,
    pub allow_large_results: bool,
    pub flatten_results: Option<bool>,
    pub udf_config: Option<Vec<Value>>,
    pub maximum_billing_tier: Option<i64>,
    pub maximum_bytes_billed: Option<Number>,
    pub create_disposition: String,
    pub schema_update_options: Vec<String>,
    pub query_params: Option<Vec<Value>>,
    pub labels: Option<Map<String, Value>>,
    pub priority: String,
    pub time_partitioning: Option<Map<String, Value>>,
    pub api_resource_configs: Option<Map<String, Value>>,
    pub cluster_fields: Option<Vec<String>>,
}

/// 外部テーブルのタスク側パラメータ。`GatewayCall::from_resolved` で
/// `CreateExternalTableCall` に写す
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalTableParams {
    bucket: String,
    source_objects: Vec<String>,
    destination_project_dataset_table: String,
    schema_fields: Option<Vec<Value>>,
    source_format: String,
    compression: String,
    skip_leading_rows: i64,
    field_delimiter: String,
    max_bad_records: i64,
    quote_character: Option<String>,
    allow_quoted_newlines: bool,
    allow_jagged_rows: bool,
    src_fmt_configs: Map<String, Value>,
    labels: Option<Map<String, Value>>,
}

impl From<ExternalTableParams> for CreateExternalTableCall {
    fn from(p: ExternalTableParams) -> Self {
        let source_uris = p
            .source_objects
            .iter()
            .map(|object| format!("gs://{}/{}", p.bucket, object))
            .collect();
        Self {
            external_project_dataset_table: p.destination_project_dataset_table,
            schema_fields: p.schema_fields,
            source_uris,
            source_format: p.source_format,
            compression: p.compression,
            skip_leading_rows: p.skip_leading_rows,
            field_delimiter: p.field_delimiter,
            max_bad_records: p.max_bad_records,
            quote_character: p.quote_character,
            allow_quoted_newlines: p.allow_quoted_newlines,
            allow_jagged_rows: p.allow_jagged_rows,
            src_fmt_configs: p.src_fmt_configs,
            labels: p.labels,
        }
    }
}

/// `GatewaySession` にそのまま渡せる 1 回分の呼び出し
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "arguments", rename_all = "snake_case")]
pub enum GatewayCall {
    CreateEmptyTable(CreateEmptyTableCall),
    CreateExternalTable(CreateExternalTableCall),
    DeleteDataset(DeleteDatasetCall),
    CreateEmptyDataset(CreateEmptyDatasetCall),
    RunQuery(RunQueryCall),
}

impl GatewayCall {
    /// 解決済みパラメータから `kind` の呼び出しを組み立てる
    pub fn from_resolved(
        kind: OperationKind,
        params: &ResolvedParams,
    ) -> Result<Self, ValidationError> {
        let call = match kind {
            OperationKind::CreateTable => GatewayCall::CreateEmptyTable(decode(kind, params)?),
            OperationKind::CreateExternalTable => {
                let p: ExternalTableParams = decode(kind, params)?;
                GatewayCall::CreateExternalTable(p.into())
            }
            OperationKind::DeleteDataset => GatewayCall::DeleteDataset(decode(kind, params)?),
            OperationKind::CreateDataset => GatewayCall::CreateEmptyDataset(decode(kind, params)?),
            OperationKind::RunQuery => GatewayCall::RunQuery(decode(kind, params)?),
        };
        Ok(call)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            GatewayCall::CreateEmptyTable(_) => OperationKind::CreateTable,
            GatewayCall::CreateExternalTable(_) => OperationKind::CreateExternalTable,
            GatewayCall::DeleteDataset(_) => OperationKind::DeleteDataset,
            GatewayCall::CreateEmptyDataset(_) => OperationKind::CreateDataset,
            GatewayCall::RunQuery(_) => OperationKind::RunQuery,
        }
    }

    /// クライアントのメソッド名（例: `create_empty_table`）
    pub fn method(&self) -> &'static str {
        self.kind().client_method()
    }

    /// クライアントが受け取るキーワード引数
    pub fn arguments(&self) -> Map<String, Value> {
        let value = match self {
            GatewayCall::CreateEmptyTable(c) => serde_json::to_value(c),
            GatewayCall::CreateExternalTable(c) => serde_json::to_value(c),
            GatewayCall::DeleteDataset(c) => serde_json::to_value(c),
            GatewayCall::CreateEmptyDataset(c) => serde_json::to_value(c),
            GatewayCall::RunQuery(c) => serde_json::to_value(c),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn decode<T: DeserializeOwned>(
    kind: OperationKind,
    params: &ResolvedParams,
) -> Result<T, ValidationError> {
    let object: Map<String, Value> = params
        .as_map()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| ValidationError::MalformedCall {
        kind,
        message: e.to_string(),
    })
}
