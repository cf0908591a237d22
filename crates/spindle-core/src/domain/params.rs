//! params - タスクパラメータと kind ごとの宣言
//!
//! 値は `serde_json::Value` のまま持ち、gateway まで素通しする。
//! `null` は「明示的に無し」で、宣言されていないパラメータとは別物。

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// パラメータ名 -> 値（またはテンプレート文字列）
///
/// `BTreeMap` なので反復順（シリアライズ・ログも）が決定的
pub type Params = BTreeMap<String, Value>;

/// テンプレート置換後のパラメータ。値はすべて確定済み
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedParams(Params);

impl ResolvedParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Params {
        &self.0
    }

    pub fn into_inner(self) -> Params {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Params> for ResolvedParams {
    fn from(params: Params) -> Self {
        Self(params)
    }
}

/// パラメータの宣言型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Bool,
    Int,
    Number,
    /// 要素がすべて内側の型のリスト
    List(&'static ParamType),
    /// 任意の JSON 値のリスト
    AnyList,
    /// 値が任意の JSON オブジェクト
    Map,
    /// 内側の型か `null`
    Nullable(&'static ParamType),
}

impl ParamType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Str => value.is_string(),
            ParamType::Bool => value.is_boolean(),
            ParamType::Int => value.is_i64(),
            ParamType::Number => value.is_number(),
            ParamType::List(inner) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| inner.accepts(item))),
            ParamType::AnyList => value.is_array(),
            ParamType::Map => value.is_object(),
            ParamType::Nullable(inner) => value.is_null() || inner.accepts(value),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Str => f.write_str("string"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Int => f.write_str("integer"),
            ParamType::Number => f.write_str("number"),
            ParamType::List(inner) => write!(f, "list<{inner}>"),
            ParamType::AnyList => f.write_str("list"),
            ParamType::Map => f.write_str("map"),
            ParamType::Nullable(inner) => write!(f, "{inner} or null"),
        }
    }
}

pub(crate) const STR: ParamType = ParamType::Str;
pub(crate) const OPT_STR: ParamType = ParamType::Nullable(&STR);
pub(crate) const STR_LIST: ParamType = ParamType::List(&STR);
pub(crate) const OPT_STR_LIST: ParamType = ParamType::Nullable(&STR_LIST);
pub(crate) const OPT_LIST: ParamType = ParamType::Nullable(&ParamType::AnyList);
pub(crate) const OPT_MAP: ParamType = ParamType::Nullable(&ParamType::Map);
pub(crate) const OPT_BOOL: ParamType = ParamType::Nullable(&ParamType::Bool);
pub(crate) const OPT_INT: ParamType = ParamType::Nullable(&ParamType::Int);
pub(crate) const OPT_NUMBER: ParamType = ParamType::Nullable(&ParamType::Number);

/// 省略されたときに入るデフォルト
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Required,
    Null,
    Str(&'static str),
    Bool(bool),
    Int(i64),
    EmptyList,
    EmptyMap,
}

impl ParamDefault {
    /// 具体的なデフォルト値。必須パラメータなら `None`
    pub fn to_value(self) -> Option<Value> {
        match self {
            ParamDefault::Required => None,
            ParamDefault::Null => Some(Value::Null),
            ParamDefault::Str(s) => Some(Value::String(s.to_string())),
            ParamDefault::Bool(b) => Some(Value::Bool(b)),
            ParamDefault::Int(i) => Some(Value::from(i)),
            ParamDefault::EmptyList => Some(Value::Array(Vec::new())),
            ParamDefault::EmptyMap => Some(Value::Object(serde_json::Map::new())),
        }
    }
}

/// operation kind が受け付けるパラメータ 1 つの宣言
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDef {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: ParamDefault,
}

impl ParamDef {
    pub const fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            default: ParamDefault::Required,
        }
    }

    pub const fn optional(name: &'static str, ty: ParamType, default: ParamDefault) -> Self {
        Self { name, ty, default }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.default, ParamDefault::Required)
    }
}

/// 検証メッセージに出す短い JSON 型名
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::string(STR, json!("x"), true)]
    #[case::string_rejects_int(STR, json!(1), false)]
    #[case::optional_string_null(OPT_STR, json!(null), true)]
    #[case::int(ParamType::Int, json!(0), true)]
    #[case::int_rejects_float(ParamType::Int, json!(1.5), false)]
    #[case::int_negative(ParamType::Int, json!(-3), true)]
    #[case::int_rejects_beyond_i64(ParamType::Int, json!(u64::MAX), false)]
    #[case::number_accepts_int(OPT_NUMBER, json!(10), true)]
    #[case::string_list(STR_LIST, json!(["a", "b"]), true)]
    #[case::string_list_rejects_mixed(STR_LIST, json!(["a", 1]), false)]
    #[case::empty_list(STR_LIST, json!([]), true)]
    #[case::map(ParamType::Map, json!({}), true)]
    #[case::map_rejects_null(ParamType::Map, json!(null), false)]
    fn param_type_accepts(#[case] ty: ParamType, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(ty.accepts(&value), expected);
    }

    #[test]
    fn param_type_display_is_readable() {
        assert_eq!(OPT_STR_LIST.to_string(), "list<string> or null");
    }

    #[test]
    fn defaults_render_to_json() {
        assert_eq!(ParamDefault::Required.to_value(), None);
        assert_eq!(ParamDefault::Null.to_value(), Some(json!(null)));
        assert_eq!(ParamDefault::EmptyMap.to_value(), Some(json!({})));
        assert_eq!(ParamDefault::EmptyList.to_value(), Some(json!([])));
        assert_eq!(
            ParamDefault::Str("WRITE_EMPTY").to_value(),
            Some(json!("WRITE_EMPTY"))
        );
    }
}
