//! spindle - run warehouse task files against a dry-run gateway.
//!
//! Usage:
//!   spindle validate <TASKS>   Validate a task file
//!   spindle render <TASKS>     Print resolved parameters for an execution date
//!   spindle run <TASKS>        Execute every task through the dry-run gateway

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spindle_core::config::{ConnectionRegistry, SpindleConfig, TaskFile};
use spindle_core::domain::{ExecutionContext, TaskSpec};
use spindle_core::impls::{DryRunGateway, MemoryReporter};
use spindle_core::template::TemplateEngine;
use spindle_core::{RunnerBuilder, WorkerGroup};

#[derive(Parser)]
#[command(name = "spindle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a task file without running anything
    Validate {
        #[arg(value_name = "TASKS")]
        tasks: PathBuf,
    },

    /// Print resolved parameters for each task
    Render {
        #[arg(value_name = "TASKS")]
        tasks: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        /// Only render this task
        #[arg(long)]
        task: Option<String>,
    },

    /// Execute every task through the dry-run gateway
    Run {
        #[arg(value_name = "TASKS")]
        tasks: PathBuf,

        #[command(flatten)]
        context: ContextArgs,

        /// Settings file (workers, connections)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Number of workers (overrides the settings file)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[derive(Args)]
struct ContextArgs {
    /// Execution date, YYYY-MM-DD or RFC 3339 (default: today, UTC)
    #[arg(short = 'd', long, value_parser = parse_execution_date)]
    execution_date: Option<DateTime<Utc>>,

    /// Upstream task output, TASK_ID=VALUE (repeatable)
    #[arg(long, value_name = "TASK_ID=VALUE", value_parser = parse_key_value)]
    upstream: Vec<(String, Value)>,

    /// Template parameter, NAME=VALUE (repeatable)
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_key_value)]
    param: Vec<(String, Value)>,
}

impl ContextArgs {
    fn execution_date(&self) -> DateTime<Utc> {
        self.execution_date.unwrap_or_else(|| {
            Utc::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now)
        })
    }

    fn apply(&self, mut ctx: ExecutionContext) -> ExecutionContext {
        for (task_id, value) in &self.upstream {
            ctx = ctx.with_upstream(task_id.clone(), value.clone());
        }
        for (name, value) in &self.param {
            ctx = ctx.with_param(name.clone(), value.clone());
        }
        ctx
    }
}

fn parse_execution_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339: {e}"))
}

/// `key=value`; the value is read as JSON when it parses, else as a string.
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { tasks } => validate(tasks),
        Commands::Render {
            tasks,
            context,
            task,
        } => render(tasks, context, task),
        Commands::Run {
            tasks,
            context,
            config,
            workers,
        } => run(tasks, context, config, workers).await,
    }
}

fn load_specs(path: &Path) -> Result<Vec<TaskSpec>> {
    TaskFile::load(path)
        .and_then(TaskFile::into_specs)
        .with_context(|| format!("loading tasks from {}", path.display()))
}

fn validate(path: PathBuf) -> Result<()> {
    let specs = load_specs(&path)?;
    // 診断の中身は TaskSpec::build が warn 済み。ここでは件数だけ出す
    for spec in &specs {
        println!("{}", validate_line(spec));
    }
    info!(tasks = specs.len(), "task file is valid");
    Ok(())
}

fn validate_line(spec: &TaskSpec) -> String {
    let mut line = format!("ok  {:<32} {:<24} conn={}", spec.task_id(), spec.kind(), spec.conn_id());
    let diagnostics = spec.diagnostics().len();
    if diagnostics > 0 {
        line.push_str(&format!(" diagnostics={diagnostics}"));
    }
    line
}

fn render(path: PathBuf, args: ContextArgs, only: Option<String>) -> Result<()> {
    let specs = load_specs(&path)?;
    let ctx = args.apply(ExecutionContext::for_date(args.execution_date()));
    let engine = TemplateEngine::new();

    let mut rendered = serde_json::Map::new();
    for spec in &specs {
        if only.as_deref().is_some_and(|id| id != spec.task_id()) {
            continue;
        }
        let resolved = engine
            .resolve(spec, &ctx)
            .with_context(|| format!("rendering task `{}`", spec.task_id()))?;
        rendered.insert(spec.task_id().to_string(), serde_json::to_value(&resolved)?);
    }
    if let Some(id) = only
        && rendered.is_empty()
    {
        bail!("no task `{id}` in {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(rendered))?);
    Ok(())
}

async fn run(
    path: PathBuf,
    args: ContextArgs,
    config: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<()> {
    let specs = load_specs(&path)?;
    let settings = match &config {
        Some(file) => SpindleConfig::load(file)
            .with_context(|| format!("loading settings from {}", file.display()))?,
        None => SpindleConfig::default(),
    };
    let registry = ConnectionRegistry::from_config(&settings)?;
    let reporter = Arc::new(MemoryReporter::new());

    let runner = RunnerBuilder::new(Arc::new(DryRunGateway::new()))
        .resolver(Arc::new(registry))
        .reporter(reporter.clone())
        .expect_connections(specs.iter().map(|s| s.conn_id().to_string()))
        .build()?;
    let runner = Arc::new(runner);

    let ctx = Arc::new(args.apply(runner.new_context(args.execution_date())));
    info!(
        run_id = %ctx.run_id,
        execution_date = %ctx.execution_date,
        tasks = specs.len(),
        "starting run"
    );

    let mut group = WorkerGroup::spawn(workers.unwrap_or(settings.workers), Arc::clone(&runner));
    for spec in specs {
        group.submit(runner.new_attempt(Arc::new(spec), Arc::clone(&ctx)))?;
    }
    let finished = group.finish().await;

    let counts = reporter.counts();
    let summary = json!({
        "run_id": ctx.run_id.to_string(),
        "execution_date": ctx.execution_date,
        "counts": counts,
        "attempts": reporter.reports(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if counts.failed > 0 {
        bail!("{} of {} tasks failed", counts.failed, finished.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spindle_core::OperationKind;

    #[test]
    fn execution_date_accepts_plain_dates() {
        assert_eq!(
            parse_execution_date("2015-01-01").unwrap(),
            Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_execution_date("2015-01-01T06:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2015, 1, 1, 4, 30, 0).unwrap()
        );
        assert!(parse_execution_date("yesterday").is_err());
    }

    #[test]
    fn key_values_parse_json_or_fall_back_to_strings() {
        assert_eq!(parse_key_value("limit=10").unwrap(), ("limit".to_string(), json!(10)));
        assert_eq!(
            parse_key_value("table=d.events").unwrap(),
            ("table".to_string(), json!("d.events"))
        );
        assert_eq!(parse_key_value("a=b=c").unwrap().1, json!("b=c"));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn cli_parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "spindle", "-v", "run", "tasks.yaml", "-d", "2015-01-01", "--workers", "4",
            "--param", "env=prod",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Run { tasks, context, workers, config } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(tasks, PathBuf::from("tasks.yaml"));
        assert_eq!(workers, Some(4));
        assert!(config.is_none());
        assert_eq!(context.param, vec![("env".to_string(), json!("prod"))]);
    }

    #[test]
    fn validate_line_counts_diagnostics() {
        let params = |raw: Value| serde_json::from_value(raw).unwrap();
        let clean = TaskSpec::build("q", OperationKind::RunQuery, params(json!({ "sql": "SELECT 1" })))
            .unwrap();
        let aliased = TaskSpec::build("old", OperationKind::RunQuery, params(json!({ "bql": "SELECT 1" })))
            .unwrap();

        let line = validate_line(&clean);
        assert!(line.starts_with("ok  q "));
        assert!(line.ends_with("conn=bigquery_default"));
        assert!(validate_line(&aliased).ends_with("conn=bigquery_default diagnostics=1"));
    }
}
