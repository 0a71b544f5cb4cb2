//! Execution events and emitters for observability.
//!
//! The scheduler emits lifecycle events through an [`EventEmitter`]; tasks may
//! emit their own events through the same handle. Delivery is fire and forget:
//! emitters must not fail the caller.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle events emitted by the scheduler during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// Workflow execution has started.
  WorkflowStarted {
    execution_id: String,
    workflow_id: String,
  },

  /// A node has started executing.
  NodeStarted {
    execution_id: String,
    node_id: String,
    task_type: String,
  },

  /// A node has completed successfully.
  NodeCompleted {
    execution_id: String,
    node_id: String,
    output: serde_json::Value,
  },

  /// A node has failed.
  NodeFailed {
    execution_id: String,
    node_id: String,
    error: String,
  },

  /// Workflow execution has completed successfully.
  WorkflowCompleted {
    execution_id: String,
    nodes_executed: usize,
    duration_ms: u64,
  },

  /// Workflow execution has failed.
  WorkflowFailed { execution_id: String, error: String },
}

impl ExecutionEvent {
  /// Wire name of the event.
  pub fn name(&self) -> &'static str {
    match self {
      ExecutionEvent::WorkflowStarted { .. } => "workflow.started",
      ExecutionEvent::NodeStarted { .. } => "node.started",
      ExecutionEvent::NodeCompleted { .. } => "node.completed",
      ExecutionEvent::NodeFailed { .. } => "node.failed",
      ExecutionEvent::WorkflowCompleted { .. } => "workflow.completed",
      ExecutionEvent::WorkflowFailed { .. } => "workflow.failed",
    }
  }

  /// Event body as JSON.
  pub fn payload(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }
}

/// Receives events by name.
///
/// Implement this trait to forward events to a bus, a websocket, a store, etc.
pub trait EventEmitter: Send + Sync {
  fn emit(&self, name: &str, payload: serde_json::Value);

  /// Emit a typed lifecycle event.
  fn emit_event(&self, event: &ExecutionEvent) {
    self.emit(event.name(), event.payload());
  }
}

/// A no-op emitter that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
  fn emit(&self, _name: &str, _payload: serde_json::Value) {}
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
  fn emit(&self, name: &str, payload: serde_json::Value) {
    debug!(event = name, %payload, "event emitted");
  }
}

/// An event as delivered through a [`ChannelEmitter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
  pub name: String,
  pub payload: serde_json::Value,
}

/// An emitter that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
  // Unbounded so a slow consumer never stalls the scheduler; volume is a
  // handful of events per node.
  sender: mpsc::UnboundedSender<EmittedEvent>,
}

impl ChannelEmitter {
  pub fn new(sender: mpsc::UnboundedSender<EmittedEvent>) -> Self {
    Self { sender }
  }

  /// Create an emitter together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<EmittedEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl EventEmitter for ChannelEmitter {
  fn emit(&self, name: &str, payload: serde_json::Value) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(EmittedEvent {
      name: name.to_string(),
      payload,
    });
  }
}
