use serde::{Deserialize, Serialize};

/// One vertex of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  /// Unique within the owning definition.
  pub id: String,

  /// Task type name, resolved against the task registry at validation time.
  #[serde(rename = "type")]
  pub task_type: String,

  /// Declared input slot names.
  #[serde(default)]
  pub inputs: Vec<String>,

  /// Declared output slot names.
  #[serde(default)]
  pub outputs: Vec<String>,

  /// Task configuration, interpreted only by the task implementation.
  /// The scheduler itself reads `timeout_ms` from it.
  #[serde(default = "empty_config")]
  pub config: serde_json::Value,

  /// Editor layout coordinates. Not part of execution semantics.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
}

fn empty_config() -> serde_json::Value {
  serde_json::Value::Object(serde_json::Map::new())
}

impl Node {
  pub fn new(id: impl Into<String>, task_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      task_type: task_type.into(),
      inputs: Vec::new(),
      outputs: Vec::new(),
      config: empty_config(),
      position: None,
    }
  }

  pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.inputs = inputs.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.outputs = outputs.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_config(mut self, config: serde_json::Value) -> Self {
    self.config = config;
    self
  }

  /// Per-node timeout declared in `config.timeout_ms`, if any.
  pub fn timeout_ms(&self) -> Option<u64> {
    self.config.get("timeout_ms").and_then(|v| v.as_u64())
  }

  pub fn has_input(&self, slot: &str) -> bool {
    self.inputs.iter().any(|s| s == slot)
  }

  pub fn has_output(&self, slot: &str) -> bool {
    self.outputs.iter().any(|s| s == slot)
  }
}

/// Cosmetic editor coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// A directed edge carrying one output slot's value into one input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub source: String,
  pub source_output: String,
  pub target: String,
  pub target_input: String,
}

impl Connection {
  pub fn new(
    source: impl Into<String>,
    source_output: impl Into<String>,
    target: impl Into<String>,
    target_input: impl Into<String>,
  ) -> Self {
    Self {
      source: source.into(),
      source_output: source_output.into(),
      target: target.into(),
      target_input: target_input.into(),
    }
  }
}
