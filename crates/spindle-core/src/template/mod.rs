//! template - タスクパラメータのテンプレート解決
//!
//! プレースホルダは handlebars 記法（`{{ ds }}`, `{{ upstream.extract }}`）。
//! strict モードで描画するので、未知の変数は空文字ではなく `TemplateError` になる。

mod engine;
mod helpers;
mod vars;

pub use self::engine::{TemplateEngine, resolve};
pub use self::vars::template_vars;
