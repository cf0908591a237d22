//! vars - テンプレートから見える変数

use chrono::{Days, NaiveDate};
use serde_json::{Value, json};

use crate::domain::{ExecutionContext, TaskSpec};

pub(crate) const DS_FORMAT: &str = "%Y-%m-%d";
const DS_NODASH_FORMAT: &str = "%Y%m%d";
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const TS_NODASH_FORMAT: &str = "%Y%m%dT%H%M%S";

/// テンプレートに渡す JSON オブジェクトを作る
pub fn template_vars(spec: &TaskSpec, ctx: &ExecutionContext) -> Value {
    let date = ctx.execution_date;
    let day = date.date_naive();
    let yesterday = day.checked_sub_days(Days::new(1));
    let tomorrow = day.checked_add_days(Days::new(1));

    json!({
        "ds": day.format(DS_FORMAT).to_string(),
        "ds_nodash": day.format(DS_NODASH_FORMAT).to_string(),
        "ts": date.format(TS_FORMAT).to_string(),
        "ts_nodash": date.format(TS_NODASH_FORMAT).to_string(),
        "execution_date": date.format(TS_FORMAT).to_string(),
        "yesterday_ds": format_day(yesterday, DS_FORMAT),
        "yesterday_ds_nodash": format_day(yesterday, DS_NODASH_FORMAT),
        "tomorrow_ds": format_day(tomorrow, DS_FORMAT),
        "tomorrow_ds_nodash": format_day(tomorrow, DS_NODASH_FORMAT),
        "run_id": ctx.run_id.to_string(),
        "task_id": spec.task_id(),
        "upstream": ctx.upstream_outputs,
        "params": ctx.params,
    })
}

// 前後の日が範囲外になるのは chrono の暦の端だけ
fn format_day(day: Option<NaiveDate>, format: &str) -> Value {
    day.map_or(Value::Null, |d| Value::String(d.format(format).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OperationKind, Params};
    use chrono::{TimeZone, Utc};

    #[test]
    fn date_variables_follow_execution_date() {
        let spec = TaskSpec::build(
            "q",
            OperationKind::DeleteDataset,
            Params::from([("dataset_id".to_string(), json!("d"))]),
        )
        .unwrap();
        let ctx = ExecutionContext::for_date(Utc.with_ymd_and_hms(2015, 1, 1, 6, 30, 0).unwrap());

        let vars = template_vars(&spec, &ctx);
        assert_eq!(vars["ds"], "2015-01-01");
        assert_eq!(vars["ds_nodash"], "20150101");
        assert_eq!(vars["ts"], "2015-01-01T06:30:00+00:00");
        assert_eq!(vars["ts_nodash"], "20150101T063000");
        assert_eq!(vars["yesterday_ds"], "2014-12-31");
        assert_eq!(vars["tomorrow_ds_nodash"], "20150102");
        assert_eq!(vars["task_id"], "q");
        assert_eq!(vars["run_id"], ctx.run_id.to_string());
    }
}
