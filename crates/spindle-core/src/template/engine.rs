use std::sync::OnceLock;

use handlebars::Handlebars;
use serde_json::Value;
use tracing::debug;

use super::helpers::register_helpers;
use super::vars::template_vars;
use crate::domain::{ExecutionContext, Params, ResolvedParams, TaskSpec};
use crate::error::TemplateError;

/// TemplateEngine - タスクパラメータ内のテンプレート文字列を描画する
///
/// 副作用なし: 同じ spec とコンテキストからは常に同じパラメータが得られる
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // パラメータは SQL と識別子。HTML ではない
        handlebars.register_escape_fn(handlebars::no_escape);
        register_helpers(&mut handlebars);
        Self { handlebars }
    }

    /// `spec` の文字列パラメータすべてのプレースホルダを置き換える
    ///
    /// リストやマップの中の文字列も描画する。数値・真偽値・null はそのまま
    pub fn resolve(
        &self,
        spec: &TaskSpec,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedParams, TemplateError> {
        let vars = template_vars(spec, ctx);
        let mut resolved = Params::new();
        for (name, value) in spec.params() {
            resolved.insert(name.clone(), self.resolve_value(name, value, &vars)?);
        }
        debug!(task_id = spec.task_id(), params = resolved.len(), "resolved templates");
        Ok(resolved.into())
    }

    /// テンプレート文字列を 1 つ描画する
    pub fn render(&self, path: &str, template: &str, vars: &Value) -> Result<String, TemplateError> {
        if !has_placeholder(template) {
            return Ok(template.to_string());
        }
        self.handlebars
            .render_template(template, vars)
            .map_err(|e| TemplateError::Unresolvable {
                param: path.to_string(),
                message: e.to_string(),
            })
    }

    fn resolve_value(&self, path: &str, value: &Value, vars: &Value) -> Result<Value, TemplateError> {
        match value {
            Value::String(s) => Ok(Value::String(self.render(path, s, vars)?)),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(&format!("{path}[{i}]"), item, vars))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.resolve_value(&format!("{path}.{key}"), item, vars)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 共有エンジンで `spec` を `ctx` に対して解決する
pub fn resolve(spec: &TaskSpec, ctx: &ExecutionContext) -> Result<ResolvedParams, TemplateError> {
    static ENGINE: OnceLock<TemplateEngine> = OnceLock::new();
    ENGINE.get_or_init(TemplateEngine::new).resolve(spec, ctx)
}

fn has_placeholder(text: &str) -> bool {
    text.contains("{{")
}
