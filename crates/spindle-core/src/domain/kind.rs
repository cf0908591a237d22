//! OperationKind - 操作の種類と、それぞれが受け付けるパラメータ

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::params::{
    OPT_BOOL, OPT_INT, OPT_LIST, OPT_MAP, OPT_NUMBER, OPT_STR, OPT_STR_LIST, ParamDef,
    ParamDefault, ParamType, STR, STR_LIST,
};

/// タスクが行うウェアハウス操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateTable,
    CreateExternalTable,
    DeleteDataset,
    CreateDataset,
    RunQuery,
}

const CREATE_TABLE_PARAMS: &[ParamDef] = &[
    ParamDef::required("dataset_id", STR),
    ParamDef::required("table_id", STR),
    ParamDef::optional("project_id", OPT_STR, ParamDefault::Null),
    ParamDef::optional("schema_fields", OPT_LIST, ParamDefault::Null),
    ParamDef::optional("time_partitioning", ParamType::Map, ParamDefault::EmptyMap),
    ParamDef::optional("labels", OPT_MAP, ParamDefault::Null),
];

const CREATE_EXTERNAL_TABLE_PARAMS: &[ParamDef] = &[
    ParamDef::required("bucket", STR),
    ParamDef::required("source_objects", STR_LIST),
    ParamDef::required("destination_project_dataset_table", STR),
    ParamDef::optional("schema_fields", OPT_LIST, ParamDefault::Null),
    ParamDef::optional("source_format", STR, ParamDefault::Str("CSV")),
    ParamDef::optional("compression", STR, ParamDefault::Str("NONE")),
    ParamDef::optional("skip_leading_rows", ParamType::Int, ParamDefault::Int(0)),
    ParamDef::optional("field_delimiter", STR, ParamDefault::Str(",")),
    ParamDef::optional("max_bad_records", ParamType::Int, ParamDefault::Int(0)),
    ParamDef::optional("quote_character", OPT_STR, ParamDefault::Null),
    ParamDef::optional("allow_quoted_newlines", ParamType::Bool, ParamDefault::Bool(false)),
    ParamDef::optional("allow_jagged_rows", ParamType::Bool, ParamDefault::Bool(false)),
    ParamDef::optional("src_fmt_configs", ParamType::Map, ParamDefault::EmptyMap),
    ParamDef::optional("labels", OPT_MAP, ParamDefault::Null),
];

const DELETE_DATASET_PARAMS: &[ParamDef] = &[
    ParamDef::required("dataset_id", STR),
    ParamDef::optional("project_id", OPT_STR, ParamDefault::Null),
];

const CREATE_DATASET_PARAMS: &[ParamDef] = &[
    ParamDef::required("dataset_id", STR),
    ParamDef::optional("project_id", OPT_STR, ParamDefault::Null),
    ParamDef::optional("dataset_reference", ParamType::Map, ParamDefault::EmptyMap),
];

const RUN_QUERY_PARAMS: &[ParamDef] = &[
    ParamDef::required("sql", STR),
    ParamDef::optional("destination_dataset_table", OPT_STR, ParamDefault::Null),
    ParamDef::optional("write_disposition", STR, ParamDefault::Str("WRITE_EMPTY")),
    ParamDef::optional("allow_large_results", ParamType::Bool, ParamDefault::Bool(false)),
    ParamDef::optional("flatten_results", OPT_BOOL, ParamDefault::Null),
    ParamDef::optional("udf_config", OPT_LIST, ParamDefault::Null),
    ParamDef::optional("maximum_billing_tier", OPT_INT, ParamDefault::Null),
    ParamDef::optional("maximum_bytes_billed", OPT_NUMBER, ParamDefault::Null),
    ParamDef::optional("create_disposition", STR, ParamDefault::Str("CREATE_IF_NEEDED")),
    ParamDef::optional("schema_update_options", STR_LIST, ParamDefault::EmptyList),
    ParamDef::optional("query_params", OPT_LIST, ParamDefault::Null),
    ParamDef::optional("labels", OPT_MAP, ParamDefault::Null),
    ParamDef::optional("priority", STR, ParamDefault::Str("INTERACTIVE")),
    ParamDef::optional("time_partitioning", OPT_MAP, ParamDefault::Null),
    ParamDef::optional("api_resource_configs", OPT_MAP, ParamDefault::Null),
    ParamDef::optional("cluster_fields", OPT_STR_LIST, ParamDefault::Null),
];

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::CreateTable,
        OperationKind::CreateExternalTable,
        OperationKind::DeleteDataset,
        OperationKind::CreateDataset,
        OperationKind::RunQuery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::CreateTable => "create_table",
            OperationKind::CreateExternalTable => "create_external_table",
            OperationKind::DeleteDataset => "delete_dataset",
            OperationKind::CreateDataset => "create_dataset",
            OperationKind::RunQuery => "run_query",
        }
    }

    /// この kind で gateway が呼ぶクライアントメソッド名
    pub fn client_method(self) -> &'static str {
        match self {
            OperationKind::CreateTable => "create_empty_table",
            OperationKind::CreateExternalTable => "create_external_table",
            OperationKind::DeleteDataset => "delete_dataset",
            OperationKind::CreateDataset => "create_empty_dataset",
            OperationKind::RunQuery => "run_query",
        }
    }

    /// この kind が受け付けるパラメータ（呼び出し順）
    pub fn param_defs(self) -> &'static [ParamDef] {
        match self {
            OperationKind::CreateTable => CREATE_TABLE_PARAMS,
            OperationKind::CreateExternalTable => CREATE_EXTERNAL_TABLE_PARAMS,
            OperationKind::DeleteDataset => DELETE_DATASET_PARAMS,
            OperationKind::CreateDataset => CREATE_DATASET_PARAMS,
            OperationKind::RunQuery => RUN_QUERY_PARAMS,
        }
    }

    pub fn param_def(self, name: &str) -> Option<&'static ParamDef> {
        self.param_defs().iter().find(|def| def.name == name)
    }

    /// 接続レベルの `use_legacy_sql` を受け付けるか
    pub fn accepts_session_options(self) -> bool {
        matches!(self, OperationKind::RunQuery)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `OperationKind::from_str` が知らない名前を受けたときのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation kind `{0}`")]
pub struct UnknownOperationKind(pub String);

impl FromStr for OperationKind {
    type Err = UnknownOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownOperationKind(s.to_string()))
    }
}
