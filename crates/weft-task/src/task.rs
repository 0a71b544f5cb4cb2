use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::TaskError;

/// Outcome of a side-effect free input check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
  pub is_valid: bool,
  pub errors: Vec<String>,
}

impl ValidationResult {
  pub fn valid() -> Self {
    Self {
      is_valid: true,
      errors: Vec::new(),
    }
  }

  pub fn invalid(error: impl Into<String>) -> Self {
    Self {
      is_valid: false,
      errors: vec![error.into()],
    }
  }

  /// Valid iff `errors` is empty.
  pub fn from_errors(errors: Vec<String>) -> Self {
    Self {
      is_valid: errors.is_empty(),
      errors,
    }
  }
}

/// Static metadata used for registry indexing and palette UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
  pub category: String,
  pub label: String,
  #[serde(default)]
  pub icon: String,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub tags: Vec<String>,
  /// Name of the external integration this task needs (e.g. "redis").
  #[serde(skip_serializing_if = "Option::is_none")]
  pub required_integration: Option<String>,
}

impl DisplayMetadata {
  pub fn new(category: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      category: category.into(),
      label: label.into(),
      ..Default::default()
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn with_icon(mut self, icon: impl Into<String>, color: impl Into<String>) -> Self {
    self.icon = icon.into();
    self.color = color.into();
    self
  }

  pub fn with_tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags = tags.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_integration(mut self, integration: impl Into<String>) -> Self {
    self.required_integration = Some(integration.into());
    self
  }
}

/// An executable, registrable unit of behavior.
///
/// The scheduler looks tasks up by [`Task::task_type`] and never inspects what
/// they do. Implementations must be shareable across concurrently running
/// nodes, so any per-invocation state belongs in the input or the
/// [`ExecutionContext`].
#[async_trait]
pub trait Task: Send + Sync {
  /// The registry key for this task.
  fn task_type(&self) -> &str;

  /// Perform the task's effect.
  ///
  /// Failures are wrapped by the scheduler with the node id and task type.
  /// The scheduler never retries; wrap the task in a retrying task if needed.
  async fn execute(
    &self,
    input: serde_json::Value,
    ctx: &ExecutionContext,
  ) -> Result<serde_json::Value, TaskError>;

  /// Pure pre-check run before `execute`. A negative result fails the node
  /// without calling `execute`.
  fn validate(&self, _input: &serde_json::Value) -> ValidationResult {
    ValidationResult::valid()
  }

  /// Accepted configuration shape, for editing tools. Not consulted at runtime.
  fn schema(&self) -> serde_json::Value {
    serde_json::json!({ "type": "object" })
  }

  fn display(&self) -> DisplayMetadata;
}
