use thiserror::Error;

/// Errors a task returns from `execute`.
#[derive(Debug, Error)]
pub enum TaskError {
  /// Missing required input field.
  #[error("missing required input: {field}")]
  MissingInput { field: String },

  /// Invalid input value.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// The task's own effect failed.
  #[error("{0}")]
  Failed(String),

  /// Task timed out.
  #[error("task timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// The task panicked or was aborted before returning.
  #[error("task aborted: {0}")]
  Aborted(String),
}

impl TaskError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }

  pub fn missing(field: impl Into<String>) -> Self {
    Self::MissingInput {
      field: field.into(),
    }
  }

  pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidInput {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::Timeout { .. })
  }
}

/// A task failure attributed to the node and task type it happened in.
#[derive(Debug, Error)]
#[error("task '{task_type}' failed on node '{node_id}': {source}")]
pub struct TaskExecutionError {
  pub task_type: String,
  pub node_id: String,
  #[source]
  pub source: TaskError,
}

impl TaskExecutionError {
  pub fn new(task_type: impl Into<String>, node_id: impl Into<String>, source: TaskError) -> Self {
    Self {
      task_type: task_type.into(),
      node_id: node_id.into(),
      source,
    }
  }
}
