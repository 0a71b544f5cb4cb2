mod config;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use weft_history::MemoryExecutionStore;
use weft_scheduler::WorkflowScheduler;
use weft_task_registry::{TaskFilter, TaskRegistry};
use weft_tasks::builtin_registry;
use weft_workflow::WorkflowDef;

use crate::config::CliConfig;

/// Weft - run dependency-ordered workflows of registered tasks
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON config file (default: ~/.weft/config.json, if present)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow, reading the trigger payload as JSON from stdin
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Check a workflow without running it
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// List the available task types
  Tasks {
    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    integration: Option<String>,

    /// Require this tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Case-insensitive match on type, label or tag
    #[arg(long)]
    search: Option<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = CliConfig::load(cli.config.as_deref())?;
  init_tracing(&config)?;

  match cli.command {
    Some(Commands::Run { workflow_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(&workflow_file, &config))?;
    }
    Some(Commands::Validate { workflow_file }) => {
      validate_workflow(&workflow_file, &config)?;
    }
    Some(Commands::Tasks {
      category,
      integration,
      tags,
      search,
    }) => {
      let filter = TaskFilter {
        category,
        integration,
        tags,
      };
      list_tasks(&filter, search.as_deref())?;
    }
    None => {
      println!("weft - use --help to see available commands");
    }
  }

  Ok(())
}

/// `RUST_LOG` wins over the config file's `log_filter`. Logs go to stderr so
/// stdout stays valid JSON.
fn init_tracing(config: &CliConfig) -> Result<()> {
  let filter = match std::env::var("RUST_LOG") {
    Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
    _ => EnvFilter::try_new(config.log_filter())
      .with_context(|| format!("invalid log filter: {}", config.log_filter()))?,
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
  Ok(())
}

fn scheduler(config: &CliConfig) -> Result<WorkflowScheduler> {
  let registry = builtin_registry().context("failed to register built-in tasks")?;
  let history = Arc::new(MemoryExecutionStore::new());
  Ok(WorkflowScheduler::new(Arc::new(registry), history).with_config(config.scheduler.clone()))
}

async fn run_workflow(workflow_file: &Path, config: &CliConfig) -> Result<()> {
  let workflow = read_workflow(workflow_file).await?;
  eprintln!("Loaded workflow: {} ({} nodes)", workflow.name, workflow.nodes.len());

  let payload = read_payload_from_stdin()?;

  let scheduler = scheduler(config)?;
  match scheduler.run(&workflow, payload).await {
    Ok(result) => {
      eprintln!(
        "Execution completed: {} ({} nodes in {}ms)",
        result.execution_id, result.nodes_executed, result.duration_ms
      );
      println!("{}", serde_json::to_string_pretty(&result)?);
      Ok(())
    }
    Err(err) => {
      // A run that got past validation is in history with its partial results.
      if let Some(failed) = scheduler.history().recent(1).into_iter().next() {
        println!("{}", serde_json::to_string_pretty(&failed)?);
      }
      Err(err).context("workflow execution failed")
    }
  }
}

fn validate_workflow(workflow_file: &Path, config: &CliConfig) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  let workflow = rt.block_on(read_workflow(workflow_file))?;

  let graph = scheduler(config)?
    .validate(&workflow)
    .context("workflow is invalid")?;

  let entry_points: Vec<&str> = graph
    .entry_points()
    .iter()
    .map(|&idx| graph.node_id(idx))
    .collect();
  println!(
    "Workflow '{}' is valid: {} nodes, {} connections, entry points: {}",
    workflow.name,
    workflow.nodes.len(),
    workflow.connections.len(),
    entry_points.join(", ")
  );
  Ok(())
}

fn list_tasks(filter: &TaskFilter, search: Option<&str>) -> Result<()> {
  let registry: TaskRegistry = builtin_registry().context("failed to register built-in tasks")?;

  let mut tasks = registry.filter(filter);
  if let Some(query) = search {
    let found: Vec<String> = registry
      .search(query)
      .iter()
      .map(|t| t.task_type().to_string())
      .collect();
    tasks.retain(|t| found.iter().any(|f| f == t.task_type()));
  }

  for task in tasks {
    let display = task.display();
    println!(
      "{:<14} {:<14} {}",
      task.task_type(),
      display.category,
      display.description
    );
  }
  Ok(())
}

async fn read_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
