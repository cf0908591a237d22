//! RunnerBuilder - Runner の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_connections() で必要な connection id を登録
//! - build() 時に全て resolve できるかチェック
//! - 不足があれば BuildError を返す（実行途中で落ちるより起動時に落ちる方がよい）

use std::sync::Arc;

use super::runner::Runner;
use crate::config::ConnectionRegistry;
use crate::gateway::Dispatcher;
use crate::impls::TracingReporter;
use crate::ports::{Clock, ConnectionResolver, Gateway, IdGenerator, Reporter, SystemClock, UlidGenerator};
use crate::template::TemplateEngine;

/// # 使用例
/// ```ignore
/// let runner = RunnerBuilder::new(Arc::new(DryRunGateway::new()))
///     .resolver(Arc::new(registry))
///     .expect_connections(["bigquery_default", "analytics"])
///     .build()?;
/// ```
///
/// 未指定の部品はデフォルト: `ConnectionRegistry::default()`, `TracingReporter`,
/// `SystemClock`, clock を共有する `UlidGenerator`
pub struct RunnerBuilder {
    gateway: Arc<dyn Gateway>,
    resolver: Option<Arc<dyn ConnectionResolver>>,
    reporter: Option<Arc<dyn Reporter>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    expected_connections: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing connections: {0:?}. These connections are used by tasks but cannot be resolved.")]
    MissingConnections(Vec<String>),
}

impl RunnerBuilder {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            resolver: None,
            reporter: None,
            clock: None,
            ids: None,
            expected_connections: Vec::new(),
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn ConnectionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// `build()` 時に resolve できなければならない connection id
    pub fn expect_connections<I, S>(mut self, conn_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_connections
            .extend(conn_ids.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Runner, BuildError> {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ConnectionRegistry::default()));

        let mut missing: Vec<String> = self
            .expected_connections
            .into_iter()
            .filter(|conn_id| resolver.resolve(conn_id).is_err())
            .collect();
        missing.sort();
        missing.dedup();
        if !missing.is_empty() {
            return Err(BuildError::MissingConnections(missing));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(Runner {
            dispatcher: Dispatcher::new(self.gateway),
            resolver,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
            clock,
            ids,
            templates: TemplateEngine::new(),
        })
    }
}
