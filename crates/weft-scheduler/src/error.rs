//! Error types for workflow scheduling.

use thiserror::Error;
use weft_task::TaskExecutionError;
use weft_workflow::WorkflowError;

/// Errors that end a run, or prevent one from starting.
#[derive(Debug, Error)]
pub enum SchedulerError {
  /// The workflow failed pre-flight validation. No node was executed.
  #[error("invalid workflow: {0}")]
  InvalidWorkflow(#[from] WorkflowError),

  /// A task rejected its assembled input.
  #[error("input validation failed for node '{node_id}' ({task_type}): {}", .errors.join("; "))]
  NodeValidation {
    node_id: String,
    task_type: String,
    errors: Vec<String>,
  },

  /// A task failed, timed out or panicked.
  #[error(transparent)]
  TaskExecution(#[from] TaskExecutionError),

  /// The node's input could not be built from its config and producers.
  #[error("input assembly failed for node '{node_id}': {message}")]
  InputAssembly { node_id: String, message: String },
}

impl SchedulerError {
  /// The node the error is attributed to, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      Self::InvalidWorkflow(_) => None,
      Self::NodeValidation { node_id, .. } | Self::InputAssembly { node_id, .. } => Some(node_id),
      Self::TaskExecution(e) => Some(&e.node_id),
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::TaskExecution(e) if e.source.is_timeout())
  }
}
