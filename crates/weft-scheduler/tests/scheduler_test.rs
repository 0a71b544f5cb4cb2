//! Integration tests for weft-scheduler using the built-in tasks plus a few
//! closure-backed test tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use weft_history::{ExecutionStatus, ExecutionStore, MemoryExecutionStore};
use weft_scheduler::{SchedulerConfig, SchedulerError, WorkflowScheduler};
use weft_task::{
  ChannelEmitter, DisplayMetadata, EmittedEvent, ExecutionContext, Task, TaskError,
  ValidationResult,
};
use weft_tasks::builtin_registry;
use weft_workflow::{Connection, Node, WorkflowDef, WorkflowError};

type Body = dyn Fn(Value, &ExecutionContext) -> Result<Value, TaskError> + Send + Sync;

/// A task whose behavior is a closure.
struct FnTask {
  task_type: String,
  body: Box<Body>,
}

impl FnTask {
  fn new(
    task_type: &str,
    body: impl Fn(Value, &ExecutionContext) -> Result<Value, TaskError> + Send + Sync + 'static,
  ) -> Arc<dyn Task> {
    Arc::new(Self {
      task_type: task_type.to_string(),
      body: Box::new(body),
    })
  }
}

#[async_trait]
impl Task for FnTask {
  fn task_type(&self) -> &str {
    &self.task_type
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    (self.body)(input, ctx)
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("testing", self.task_type.clone())
  }
}

/// Rejects every input in `validate`.
struct PickyTask;

#[async_trait]
impl Task for PickyTask {
  fn task_type(&self) -> &str {
    "picky"
  }

  async fn execute(&self, _input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    Ok(json!("should not run"))
  }

  fn validate(&self, _input: &Value) -> ValidationResult {
    ValidationResult::from_errors(vec!["needs a name".to_string(), "needs an age".to_string()])
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("testing", "Picky")
  }
}

struct Harness {
  scheduler: WorkflowScheduler,
  history: Arc<MemoryExecutionStore>,
  events: UnboundedReceiver<EmittedEvent>,
}

impl Harness {
  fn new(extra: Vec<Arc<dyn Task>>) -> Self {
    Self::with_config(extra, SchedulerConfig::default())
  }

  fn with_config(extra: Vec<Arc<dyn Task>>, config: SchedulerConfig) -> Self {
    let mut registry = builtin_registry().unwrap();
    registry.register_many(extra).unwrap();
    let history = Arc::new(MemoryExecutionStore::new());
    let (emitter, events) = ChannelEmitter::channel();
    let scheduler = WorkflowScheduler::new(Arc::new(registry), history.clone())
      .with_emitter(Arc::new(emitter))
      .with_config(config);
    Self {
      scheduler,
      history,
      events,
    }
  }

  fn drain(&mut self) -> Vec<EmittedEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = self.events.try_recv() {
      drained.push(event);
    }
    drained
  }
}

fn node(id: &str, task_type: &str) -> Node {
  Node::new(id, task_type).with_inputs(["in"])
}

fn link(source: &str, target: &str) -> Connection {
  Connection::new(source, "out", target, "in")
}

fn linear_workflow() -> WorkflowDef {
  WorkflowDef::new("linear", "Linear")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("fetch", "fetch"))
    .with_node(node("store", "store").with_config(json!({ "total": "{{ results.fetch.count }}" })))
    .with_connection(link("start", "fetch"))
    .with_connection(link("fetch", "store"))
}

fn linear_tasks() -> Vec<Arc<dyn Task>> {
  vec![
    FnTask::new("fetch", |_input, _ctx| Ok(json!({ "count": 5 }))),
    FnTask::new("store", |input, ctx| {
      // The producer's output is already recorded when a dependent runs.
      let seen = ctx
        .results
        .get("fetch")
        .ok_or_else(|| TaskError::failed("fetch result not visible"))?;
      Ok(json!({ "stored": input["in"], "seen": seen, "total": input["total"] }))
    }),
  ]
}

#[tokio::test]
async fn test_linear_workflow() {
  let mut harness = Harness::new(linear_tasks());

  let result = harness
    .scheduler
    .run(&linear_workflow(), json!({ "source": "test" }))
    .await
    .unwrap();

  assert_eq!(result.status, ExecutionStatus::Completed);
  assert_eq!(result.nodes_executed, 3);
  assert!(result.errors.is_empty());
  assert_eq!(result.output("start"), Some(&json!({ "source": "test" })));
  assert_eq!(result.output("fetch"), Some(&json!({ "count": 5 })));
  assert_eq!(
    result.output("store"),
    Some(&json!({
      "stored": { "count": 5 },
      "seen": { "count": 5 },
      "total": 5,
    }))
  );

  let names: Vec<String> = harness.drain().into_iter().map(|e| e.name).collect();
  assert_eq!(
    names,
    vec![
      "workflow.started",
      "node.started",
      "node.completed",
      "node.started",
      "node.completed",
      "node.started",
      "node.completed",
      "workflow.completed",
    ]
  );
}

#[tokio::test]
async fn test_completed_run_is_recorded() {
  let harness = Harness::new(linear_tasks());

  let result = harness
    .scheduler
    .run(&linear_workflow(), json!({}))
    .await
    .unwrap();

  assert_eq!(harness.history.len(), 1);
  assert_eq!(harness.history.recent(1), vec![result.clone()]);
  assert_eq!(harness.history.get(&result.execution_id), Some(result));
}

#[tokio::test]
async fn test_fan_out_of_fifty_set_nodes() {
  let harness = Harness::new(vec![]);

  let mut workflow = WorkflowDef::new("fan", "Fan out").with_node(Node::new("start", "trigger"));
  for i in 0..50 {
    let id = format!("set_{i}");
    workflow = workflow
      .with_node(node(&id, "set").with_config(json!({ "key": format!("k{i}"), "value": i })))
      .with_connection(link("start", &id));
  }

  let result = harness.scheduler.run(&workflow, json!({})).await.unwrap();

  assert_eq!(result.nodes_executed, 51);
  assert_eq!(result.data.len(), 50);
  assert_eq!(result.data["k0"], json!(0));
  assert_eq!(result.data["k49"], json!(49));
}

#[tokio::test]
async fn test_join_waits_for_every_producer() {
  let mut harness = Harness::new(vec![FnTask::new("check_join", |input, ctx| {
    for producer in ["slow", "fast"] {
      if !ctx.results.contains(producer) {
        return Err(TaskError::failed(format!("{producer} has not completed")));
      }
    }
    Ok(input["in"].clone())
  })]);

  let workflow = WorkflowDef::new("join", "Join")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("slow", "delay").with_config(json!({ "ms": 80 })))
    .with_node(node("fast", "delay").with_config(json!({ "ms": 5 })))
    .with_node(node("join", "check_join"))
    .with_connection(link("start", "slow"))
    .with_connection(link("start", "fast"))
    .with_connection(link("slow", "join"))
    .with_connection(link("fast", "join"));

  let result = harness.scheduler.run(&workflow, json!({ "n": 1 })).await.unwrap();

  assert_eq!(result.nodes_executed, 4);
  // One slot fed by two connections receives both values in declaration order.
  assert_eq!(
    result.output("join"),
    Some(&json!([{ "in": { "n": 1 } }, { "in": { "n": 1 } }]))
  );

  let events = harness.drain();
  let position = |name: &str, node_id: &str| {
    events
      .iter()
      .position(|e| e.name == name && e.payload["node_id"] == node_id)
      .unwrap()
  };
  assert!(position("node.completed", "slow") < position("node.started", "join"));
  assert!(position("node.completed", "fast") < position("node.started", "join"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_branches_overlap() {
  let harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("parallel", "Parallel")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("left", "delay").with_config(json!({ "ms": 300 })))
    .with_node(node("right", "delay").with_config(json!({ "ms": 300 })))
    .with_connection(link("start", "left"))
    .with_connection(link("start", "right"));

  let started = Instant::now();
  let result = harness.scheduler.run(&workflow, json!({})).await.unwrap();
  let elapsed = started.elapsed();

  assert_eq!(result.nodes_executed, 3);
  assert!(elapsed >= Duration::from_millis(300), "took {elapsed:?}");
  assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
}

#[tokio::test]
async fn test_failure_stops_unstarted_nodes() {
  let mut harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("failing", "Failing")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("boom", "fail").with_config(json!({ "message": "upstream exploded" })))
    .with_node(node("after", "set").with_config(json!({ "key": "reached", "value": true })))
    .with_connection(link("start", "boom"))
    .with_connection(link("boom", "after"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  assert_eq!(err.node_id(), Some("boom"));
  match &err {
    SchedulerError::TaskExecution(e) => {
      assert_eq!(e.task_type, "fail");
      assert_eq!(e.source.to_string(), "upstream exploded");
    }
    other => panic!("unexpected error: {other}"),
  }

  let recorded = harness.history.recent(1).remove(0);
  assert_eq!(recorded.status, ExecutionStatus::Failed);
  assert_eq!(recorded.nodes_executed, 1);
  assert!(recorded.output("start").is_some());
  assert!(recorded.output("after").is_none());
  assert!(!recorded.data.contains_key("reached"));
  assert_eq!(recorded.errors.len(), 1);
  assert_eq!(recorded.errors[0].node_id.as_deref(), Some("boom"));

  let events = harness.drain();
  let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
  assert_eq!(names.last(), Some(&"workflow.failed"));
  assert!(names.contains(&"node.failed"));
  assert!(!names.contains(&"workflow.completed"));
  assert!(
    !events
      .iter()
      .any(|e| e.name == "node.started" && e.payload["node_id"] == "after")
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_skips_transitive_dependents_and_drops_running_branches() {
  let mut harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("failing-branches", "Failing branches")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("boom", "fail").with_config(json!({ "message": "boom" })))
    .with_node(node("a1", "passthrough"))
    .with_node(node("a2", "passthrough"))
    .with_node(node("slow", "delay").with_config(json!({ "ms": 300 })))
    .with_node(node("slow_set", "set").with_config(json!({ "key": "slow", "value": true })))
    .with_connection(link("start", "boom"))
    .with_connection(link("boom", "a1"))
    .with_connection(link("a1", "a2"))
    .with_connection(link("start", "slow"))
    .with_connection(link("slow", "slow_set"));

  let started = Instant::now();
  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();
  let elapsed = started.elapsed();

  assert_eq!(err.node_id(), Some("boom"));
  assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");

  // Let the detached branch finish; it must not touch the recorded run.
  tokio::time::sleep(Duration::from_millis(500)).await;

  assert_eq!(harness.history.len(), 1);
  let recorded = harness.history.recent(1).remove(0);
  assert_eq!(recorded.status, ExecutionStatus::Failed);
  assert_eq!(recorded.nodes_executed, 1);
  let mut recorded_nodes: Vec<&str> = recorded.results.keys().map(String::as_str).collect();
  recorded_nodes.sort_unstable();
  assert_eq!(recorded_nodes, vec!["start"]);
  assert!(!recorded.data.contains_key("slow"));

  let events = harness.drain();
  let started_nodes: Vec<&Value> = events
    .iter()
    .filter(|e| e.name == "node.started")
    .map(|e| &e.payload["node_id"])
    .collect();
  assert!(!started_nodes.contains(&&json!("a1")));
  assert!(!started_nodes.contains(&&json!("a2")));
  assert!(
    !events
      .iter()
      .any(|e| e.name == "node.completed" && e.payload["node_id"] == "slow")
  );
  let run_events: Vec<&str> = events
    .iter()
    .map(|e| e.name.as_str())
    .filter(|name| name.starts_with("workflow."))
    .collect();
  assert_eq!(run_events, vec!["workflow.started", "workflow.failed"]);
}

#[tokio::test]
async fn test_missing_trigger_is_rejected_before_running() {
  let mut harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("no-trigger", "No trigger")
    .with_node(Node::new("only", "constant").with_config(json!({ "value": 1 })));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    SchedulerError::InvalidWorkflow(WorkflowError::MissingTrigger { .. })
  ));
  assert!(err.to_string().contains("trigger node"));
  assert_eq!(err.node_id(), None);
  assert!(harness.history.is_empty());
  assert!(harness.drain().is_empty());
}

#[tokio::test]
async fn test_unknown_task_type_is_named() {
  let harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("unknown", "Unknown")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("mystery", "teleport"))
    .with_connection(link("start", "mystery"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  assert!(err.to_string().contains("unknown task type: teleport"));
  assert!(harness.history.is_empty());
}

#[tokio::test]
async fn test_cycle_is_rejected() {
  let harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("cycle", "Cycle")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("a", "passthrough"))
    .with_node(node("b", "passthrough"))
    .with_connection(link("start", "a"))
    .with_connection(link("a", "b"))
    .with_connection(link("b", "a"));

  let err = harness.scheduler.validate(&workflow).unwrap_err();
  assert!(err.to_string().contains("circular"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();
  assert!(err.to_string().contains("circular"));
}

#[tokio::test]
async fn test_undeclared_input_slot_is_rejected() {
  let harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("slots", "Slots")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("next", "passthrough"))
    .with_connection(Connection::new("start", "out", "next", "nope"));

  let err = harness.scheduler.validate(&workflow).unwrap_err();
  assert!(matches!(
    err,
    SchedulerError::InvalidWorkflow(WorkflowError::UndeclaredInput { .. })
  ));
}

#[tokio::test]
async fn test_node_timeout() {
  let harness = Harness::new(vec![]);

  let workflow = WorkflowDef::new("slow", "Slow")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("sleepy", "delay").with_config(json!({ "ms": 5_000, "timeout_ms": 20 })))
    .with_connection(link("start", "sleepy"));

  let started = Instant::now();
  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  assert!(err.is_timeout(), "unexpected error: {err}");
  assert_eq!(err.node_id(), Some("sleepy"));
  assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_default_node_timeout_from_config() {
  let config = SchedulerConfig {
    default_node_timeout_ms: Some(20),
    ..SchedulerConfig::default()
  };
  let harness = Harness::with_config(vec![], config);

  let workflow = WorkflowDef::new("slow", "Slow")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("sleepy", "delay").with_config(json!({ "ms": 5_000 })))
    .with_connection(link("start", "sleepy"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();
  assert!(err.is_timeout());
}

#[tokio::test]
async fn test_validation_rejection_fails_the_node() {
  let harness = Harness::new(vec![Arc::new(PickyTask)]);

  let workflow = WorkflowDef::new("picky", "Picky")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("check", "picky"))
    .with_connection(link("start", "check"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  match err {
    SchedulerError::NodeValidation {
      node_id,
      task_type,
      errors,
    } => {
      assert_eq!(node_id, "check");
      assert_eq!(task_type, "picky");
      assert_eq!(errors.len(), 2);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(harness.history.recent(1)[0].status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_panicking_task_fails_its_node() {
  let harness = Harness::new(vec![FnTask::new("explode", |_input, _ctx| {
    panic!("kaboom")
  })]);

  let workflow = WorkflowDef::new("panic", "Panic")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("bad", "explode"))
    .with_connection(link("start", "bad"));

  let err = harness
    .scheduler
    .run(&workflow, json!({}))
    .await
    .unwrap_err();

  assert_eq!(err.node_id(), Some("bad"));
  match err {
    SchedulerError::TaskExecution(e) => {
      assert!(matches!(e.source, TaskError::Aborted(_)));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn test_custom_trigger_type_receives_payload() {
  let config = SchedulerConfig {
    trigger_type: "webhook".to_string(),
    ..SchedulerConfig::default()
  };
  let harness = Harness::with_config(
    vec![FnTask::new("webhook", |input, _ctx| Ok(input["payload"].clone()))],
    config,
  );

  let workflow = WorkflowDef::new("hook", "Hook")
    .with_node(Node::new("incoming", "webhook"))
    .with_node(node("echo", "passthrough"))
    .with_connection(link("incoming", "echo"));

  let result = harness
    .scheduler
    .run(&workflow, json!({ "body": "hi" }))
    .await
    .unwrap();

  assert_eq!(result.output("echo"), Some(&json!({ "in": { "body": "hi" } })));

  // Under this config a plain `trigger` node no longer counts.
  let plain = WorkflowDef::new("plain", "Plain").with_node(Node::new("start", "trigger"));
  let err = harness.scheduler.validate(&plain).unwrap_err();
  assert!(err.to_string().contains("'webhook'"));
}

#[tokio::test]
async fn test_named_outputs_route_fields() {
  let harness = Harness::new(vec![FnTask::new("split", |_input, _ctx| {
    Ok(json!({ "even": [2, 4], "odd": [1, 3] }))
  })]);

  let workflow = WorkflowDef::new("route", "Route")
    .with_node(Node::new("start", "trigger"))
    .with_node(node("split", "split").with_outputs(["even", "odd"]))
    .with_node(Node::new("sink", "passthrough").with_inputs(["evens", "odds"]))
    .with_connection(link("start", "split"))
    .with_connection(Connection::new("split", "even", "sink", "evens"))
    .with_connection(Connection::new("split", "odd", "sink", "odds"));

  let result = harness.scheduler.run(&workflow, json!({})).await.unwrap();
  assert_eq!(
    result.output("sink"),
    Some(&json!({ "evens": [2, 4], "odds": [1, 3] }))
  );
}

#[tokio::test]
async fn test_concurrent_runs_share_history() {
  let harness = Harness::new(linear_tasks());
  let workflow = linear_workflow();

  let (a, b) = tokio::join!(
    harness.scheduler.run(&workflow, json!({ "run": "a" })),
    harness.scheduler.run(&workflow, json!({ "run": "b" })),
  );
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_ne!(a.execution_id, b.execution_id);
  assert_eq!(harness.history.list_for_workflow("linear", 10).len(), 2);
}
