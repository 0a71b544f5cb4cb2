//! Workflow scheduler implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::task::{self, JoinSet};
use tracing::{Instrument, error, info, info_span, instrument};
use weft_history::{ExecutionResult, ExecutionStatus, ExecutionStore, RunError};
use weft_task::{
  EventEmitter, ExecutionContext, ExecutionEvent, Logger, RunResults, ScratchData, Task,
  TaskError, TaskExecutionError, TracingEmitter, TracingLogger,
};
use weft_task_registry::TaskRegistry;
use weft_workflow::{Graph, Node, WorkflowDef};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::input::{assemble_input, gather_slots};

/// Runs workflows against a task registry and records every run in history.
///
/// The scheduler holds no per-run state; one instance can drive any number of
/// concurrent runs.
pub struct WorkflowScheduler {
  registry: Arc<TaskRegistry>,
  history: Arc<dyn ExecutionStore>,
  events: Arc<dyn EventEmitter>,
  /// Shared logger handed to every node. `None` gives each node its own
  /// [`TracingLogger`].
  logger: Option<Arc<dyn Logger>>,
  config: SchedulerConfig,
}

/// Handles shared by every node of a single run.
struct RunState {
  execution_id: String,
  workflow_id: String,
  payload: Value,
  metadata: Arc<Map<String, Value>>,
  data: ScratchData,
  results: RunResults,
}

/// Result of one spawned node, tagged with its graph index.
type NodeOutcome = (usize, Result<Value, SchedulerError>);

impl WorkflowScheduler {
  pub fn new(registry: Arc<TaskRegistry>, history: Arc<dyn ExecutionStore>) -> Self {
    Self {
      registry,
      history,
      events: Arc::new(TracingEmitter),
      logger: None,
      config: SchedulerConfig::default(),
    }
  }

  /// Send lifecycle events (and task-emitted events) to `events`.
  pub fn with_emitter(mut self, events: Arc<dyn EventEmitter>) -> Self {
    self.events = events;
    self
  }

  /// Hand every node the same logger instead of a per-node tracing logger.
  pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
    self.logger = Some(logger);
    self
  }

  pub fn with_config(mut self, config: SchedulerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  pub fn registry(&self) -> &Arc<TaskRegistry> {
    &self.registry
  }

  pub fn history(&self) -> &Arc<dyn ExecutionStore> {
    &self.history
  }

  /// Pre-flight checks without running anything.
  ///
  /// Fails if the workflow has no trigger node, names an unregistered task
  /// type, has duplicate node ids or dangling connections, wires undeclared
  /// slots, or contains a cycle.
  pub fn validate(&self, workflow: &WorkflowDef) -> Result<Graph, SchedulerError> {
    let graph = workflow.validate(&self.config.trigger_type, |task_type| {
      self.registry.has(task_type)
    })?;
    Ok(graph)
  }

  /// Execute a workflow with the given trigger payload.
  ///
  /// Validation failures return before any node runs and are not recorded.
  /// Once the run has started, both completed and failed runs are appended
  /// to history.
  #[instrument(
    name = "workflow_run",
    skip(self, workflow, payload),
    fields(workflow_id = %workflow.id, execution_id = tracing::field::Empty)
  )]
  pub async fn run(
    &self,
    workflow: &WorkflowDef,
    payload: Value,
  ) -> Result<ExecutionResult, SchedulerError> {
    let graph = self.validate(workflow)?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("execution_id", execution_id.as_str());
    let started_at = Utc::now();
    let clock = Instant::now();

    info!(
      execution_id = %execution_id,
      workflow_id = %workflow.id,
      payload = %payload,
      "workflow_started"
    );
    self.events.emit_event(&ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow_id: workflow.id.clone(),
    });

    let run = RunState {
      execution_id,
      workflow_id: workflow.id.clone(),
      payload,
      metadata: Arc::new(workflow.metadata.clone()),
      data: ScratchData::new(),
      results: RunResults::new(),
    };

    let outcome = self.drive(workflow, &graph, &run).await;
    let duration_ms = clock.elapsed().as_millis() as u64;

    let (nodes_executed, failure) = match outcome {
      Ok(executed) => (executed, None),
      Err((executed, err)) => (executed, Some(err)),
    };

    let result = ExecutionResult {
      execution_id: run.execution_id.clone(),
      workflow_id: run.workflow_id.clone(),
      status: if failure.is_some() {
        ExecutionStatus::Failed
      } else {
        ExecutionStatus::Completed
      },
      nodes_executed,
      results: run.results.view().snapshot(),
      data: run.data.snapshot(),
      errors: failure
        .iter()
        .map(|e| RunError {
          node_id: e.node_id().map(str::to_string),
          message: e.to_string(),
        })
        .collect(),
      started_at,
      finished_at: Utc::now(),
      duration_ms,
    };
    self.history.append(result.clone());

    match failure {
      None => {
        info!(
          execution_id = %run.execution_id,
          nodes_executed,
          duration_ms,
          "workflow_completed"
        );
        self.events.emit_event(&ExecutionEvent::WorkflowCompleted {
          execution_id: run.execution_id.clone(),
          nodes_executed,
          duration_ms,
        });
        Ok(result)
      }
      Some(err) => {
        error!(
          execution_id = %run.execution_id,
          error = %err,
          "workflow_failed"
        );
        self.events.emit_event(&ExecutionEvent::WorkflowFailed {
          execution_id: run.execution_id.clone(),
          error: err.to_string(),
        });
        Err(err)
      }
    }
  }

  /// Dispatch nodes as their producers complete until every node has run or
  /// one fails. Returns the number of nodes that completed.
  async fn drive(
    &self,
    workflow: &WorkflowDef,
    graph: &Graph,
    run: &RunState,
  ) -> Result<usize, (usize, SchedulerError)> {
    let mut waiting_on: Vec<usize> = (0..graph.len()).map(|i| graph.producers(i).len()).collect();
    let mut in_flight: JoinSet<NodeOutcome> = JoinSet::new();
    let mut spawned: HashMap<task::Id, usize> = HashMap::new();
    let mut executed = 0;

    let order = graph
      .topological_order()
      .map_err(|e| (executed, SchedulerError::from(e)))?;

    for idx in order.into_iter().filter(|&i| waiting_on[i] == 0) {
      match self.launch(workflow, idx, run, &mut in_flight) {
        Ok(id) => {
          spawned.insert(id, idx);
        }
        Err(err) => return Err(self.abandon(run, &workflow.nodes[idx], in_flight, executed, err)),
      }
    }

    while let Some(joined) = in_flight.join_next_with_id().await {
      // Panics are caught by the inner spawn; the wrapper itself only fails
      // when it is aborted or the runtime shuts down.
      let (idx, outcome) = match joined {
        Ok((id, tagged)) => {
          spawned.remove(&id);
          tagged
        }
        Err(join_error) => {
          let Some(idx) = spawned.remove(&join_error.id()) else {
            error!(
              execution_id = %run.execution_id,
              error = %join_error,
              "untracked node wrapper task failed"
            );
            continue;
          };
          (idx, Err(wrapper_failure(&workflow.nodes[idx], &join_error)))
        }
      };
      let node = &workflow.nodes[idx];

      match outcome {
        Ok(output) => {
          run.results.record(node.id.clone(), output.clone());
          executed += 1;

          info!(
            execution_id = %run.execution_id,
            node_id = %node.id,
            output = %output,
            "node_completed"
          );
          self.events.emit_event(&ExecutionEvent::NodeCompleted {
            execution_id: run.execution_id.clone(),
            node_id: node.id.clone(),
            output,
          });

          for &next in graph.consumers(idx) {
            waiting_on[next] -= 1;
            if waiting_on[next] == 0 {
              match self.launch(workflow, next, run, &mut in_flight) {
                Ok(id) => {
                  spawned.insert(id, next);
                }
                Err(err) => {
                  return Err(self.abandon(run, &workflow.nodes[next], in_flight, executed, err));
                }
              }
            }
          }
        }
        Err(err) => return Err(self.abandon(run, node, in_flight, executed, err)),
      }
    }

    Ok(executed)
  }

  /// Record a node failure and let whatever is still running finish
  /// unobserved.
  fn abandon(
    &self,
    run: &RunState,
    node: &Node,
    mut in_flight: JoinSet<NodeOutcome>,
    executed: usize,
    err: SchedulerError,
  ) -> (usize, SchedulerError) {
    error!(
      execution_id = %run.execution_id,
      node_id = %node.id,
      error = %err,
      in_flight = in_flight.len(),
      "node_failed"
    );
    self.events.emit_event(&ExecutionEvent::NodeFailed {
      execution_id: run.execution_id.clone(),
      node_id: node.id.clone(),
      error: err.to_string(),
    });
    in_flight.detach_all();
    (executed, err)
  }

  /// Assemble a node's input, run its pre-check and spawn its execution.
  /// Returns the id of the task added to `in_flight`.
  fn launch(
    &self,
    workflow: &WorkflowDef,
    idx: usize,
    run: &RunState,
    in_flight: &mut JoinSet<NodeOutcome>,
  ) -> Result<task::Id, SchedulerError> {
    let node = &workflow.nodes[idx];

    info!(
      execution_id = %run.execution_id,
      node_id = %node.id,
      task_type = %node.task_type,
      "node_started"
    );
    self.events.emit_event(&ExecutionEvent::NodeStarted {
      execution_id: run.execution_id.clone(),
      node_id: node.id.clone(),
      task_type: node.task_type.clone(),
    });

    let task = self
      .registry
      .get(&node.task_type)
      .ok_or_else(|| weft_workflow::WorkflowError::UnknownTaskType(node.task_type.clone()))?;

    let results = run.results.view();
    let slots = gather_slots(workflow, node, &results)?;
    let payload = (node.task_type == self.config.trigger_type).then_some(&run.payload);
    let input = assemble_input(node, slots, &results, &run.metadata, payload)?;

    let check = task.validate(&input);
    if !check.is_valid {
      return Err(SchedulerError::NodeValidation {
        node_id: node.id.clone(),
        task_type: node.task_type.clone(),
        errors: check.errors,
      });
    }

    let ctx = ExecutionContext {
      execution_id: run.execution_id.clone(),
      node_id: node.id.clone(),
      workflow_id: run.workflow_id.clone(),
      logger: self.logger.clone().unwrap_or_else(|| {
        Arc::new(TracingLogger::new(run.execution_id.clone(), node.id.clone())) as Arc<dyn Logger>
      }),
      events: self.events.clone(),
      metadata: run.metadata.clone(),
      data: run.data.clone(),
      results,
    };
    let timeout_ms = node.timeout_ms().or(self.config.default_node_timeout_ms);
    let span = info_span!("node_execute", node_id = %node.id, task_type = %node.task_type);
    let handle = tokio::spawn(execute_node(task, input, ctx, timeout_ms).instrument(span));

    let task_type = node.task_type.clone();
    let node_id = node.id.clone();
    let wrapper = in_flight.spawn(async move {
      let outcome = match handle.await {
        Ok(result) => result,
        Err(join_error) => Err(TaskError::Aborted(join_error.to_string())),
      };
      let outcome =
        outcome.map_err(|e| SchedulerError::from(TaskExecutionError::new(task_type, node_id, e)));
      (idx, outcome)
    });

    Ok(wrapper.id())
  }
}

/// The node's own spawn never completed through its wrapper, so the node has
/// no output and the run cannot finish.
fn wrapper_failure(node: &Node, join_error: &task::JoinError) -> SchedulerError {
  TaskExecutionError::new(
    node.task_type.clone(),
    node.id.clone(),
    TaskError::Aborted(join_error.to_string()),
  )
  .into()
}

/// Run a task, bounded by its timeout when one applies.
async fn execute_node(
  task: Arc<dyn Task>,
  input: Value,
  ctx: ExecutionContext,
  timeout_ms: Option<u64>,
) -> Result<Value, TaskError> {
  match timeout_ms {
    Some(ms) => tokio::time::timeout(Duration::from_millis(ms), task.execute(input, &ctx))
      .await
      .unwrap_or_else(|_| Err(TaskError::Timeout { timeout_ms: ms })),
    None => task.execute(input, &ctx).await,
  }
}
