use thiserror::Error;

/// Structural problems found while validating a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("workflow must have at least one trigger node (type '{trigger_type}')")]
  MissingTrigger { trigger_type: String },

  #[error("unknown task type: {0}")]
  UnknownTaskType(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("connection references unknown node: {0}")]
  UnknownNode(String),

  #[error("node '{node_id}' has no declared input slot '{slot}'")]
  UndeclaredInput { node_id: String, slot: String },

  #[error("node '{node_id}' has no declared output slot '{slot}'")]
  UndeclaredOutput { node_id: String, slot: String },

  #[error("workflow contains circular dependencies (involving node '{0}')")]
  CircularDependency(String),
}
