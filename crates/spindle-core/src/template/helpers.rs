//! helpers - テンプレート内で使える日付ヘルパー
//!
//! - `{{ ds_add ds 7 }}`: `YYYY-MM-DD` を日数ぶんずらす
//! - `{{ ds_format ds "%Y-%m-%d" "%Y/%m/%d" }}`: 日付文字列の書式を変える
//!
//! # 学習ポイント
//! - `handlebars_helper!` は戻り値が `String` に限られ、失敗を返せない
//! - 失敗しうるヘルパーは `HelperDef` を関数で書き、`RenderErrorReason` で返す
//! - chrono の `format()` は `Display` で失敗を返すので `to_string()` ではなく `write!` で受ける
//!
//! 日付として読めない入力はそのまま返す。出力書式が不正なときはレンダリングエラー。

use std::fmt::Write as _;

use chrono::{NaiveDate, TimeDelta};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
    handlebars_helper,
};

use super::vars::DS_FORMAT;

handlebars_helper!(ds_add: |ds: str, days: i64| shift_ds(ds, days));

pub(crate) fn register_helpers(handlebars: &mut Handlebars<'static>) {
    handlebars.register_helper("ds_add", Box::new(ds_add));
    handlebars.register_helper("ds_format", Box::new(ds_format));
}

fn ds_format(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let ds = str_param(h, 0)?;
    let input = str_param(h, 1)?;
    let output = str_param(h, 2)?;
    let text = reformat_ds(ds, input, output).map_err(RenderErrorReason::Other)?;
    out.write(&text)?;
    Ok(())
}

fn str_param<'a>(h: &'a Helper, index: usize) -> Result<&'a str, RenderErrorReason> {
    let param = h
        .param(index)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("ds_format", index))?;
    param.value().as_str().ok_or_else(|| {
        RenderErrorReason::ParamTypeMismatchForName(
            "ds_format",
            index.to_string(),
            "string".to_string(),
        )
    })
}

fn shift_ds(ds: &str, days: i64) -> String {
    NaiveDate::parse_from_str(ds, DS_FORMAT)
        .ok()
        .zip(TimeDelta::try_days(days))
        .and_then(|(date, delta)| date.checked_add_signed(delta))
        .map_or_else(|| ds.to_string(), |date| date.format(DS_FORMAT).to_string())
}

fn reformat_ds(ds: &str, input: &str, output: &str) -> Result<String, String> {
    let Ok(date) = NaiveDate::parse_from_str(ds, input) else {
        return Ok(ds.to_string());
    };
    let mut text = String::new();
    write!(text, "{}", date.format(output))
        .map_err(|_| format!("ds_format: `{output}` is not a valid date format"))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::forward("2015-01-01", 5, "2015-01-06")]
    #[case::backward("2015-01-01", -1, "2014-12-31")]
    #[case::leap("2016-02-28", 1, "2016-02-29")]
    #[case::garbage("not-a-date", 3, "not-a-date")]
    fn shift_ds_moves_by_days(#[case] ds: &str, #[case] days: i64, #[case] expected: &str) {
        assert_eq!(shift_ds(ds, days), expected);
    }

    #[test]
    fn reformat_ds_converts_between_formats() {
        assert_eq!(reformat_ds("2015-01-05", "%Y-%m-%d", "%m-%d-%y").unwrap(), "01-05-15");
        assert_eq!(reformat_ds("x", "%Y-%m-%d", "%m-%d-%y").unwrap(), "x");
    }

    // 日付に時刻はないので %H は書けない。%Q はそもそも指定子ではない
    #[rstest]
    #[case::time_field("%Y-%m-%dT%H")]
    #[case::unknown_specifier("%Q")]
    #[case::dangling_percent("%Y%")]
    fn reformat_ds_rejects_unusable_output_formats(#[case] output: &str) {
        let err = reformat_ds("2015-01-05", "%Y-%m-%d", output).unwrap_err();
        assert!(err.contains(output));
    }

    #[test]
    fn ds_format_failure_surfaces_as_render_error() {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        register_helpers(&mut handlebars);
        let vars = json!({ "ds": "2015-01-05" });

        let ok = handlebars
            .render_template(r#"{{ ds_format ds "%Y-%m-%d" "%d/%m/%Y" }}"#, &vars)
            .unwrap();
        assert_eq!(ok, "05/01/2015");

        let err = handlebars
            .render_template(r#"{{ ds_format ds "%Y-%m-%d" "%Y-%m-%dT%H" }}"#, &vars)
            .unwrap_err();
        assert!(err.to_string().contains("not a valid date format"));
    }
}
