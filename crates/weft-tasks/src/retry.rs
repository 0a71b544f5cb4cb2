//! Task-level retry.
//!
//! The scheduler never retries; a task that should be retried is wrapped in
//! [`RetryTask`] before registration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use weft_task::{DisplayMetadata, ExecutionContext, Task, TaskError, ValidationResult};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
  #[default]
  Constant,
  Linear,
  Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Zero behaves like one.
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff: RetryBackoff::Constant,
      initial_delay_ms: 100,
      max_delay_ms: 30_000,
    }
  }
}

impl RetryPolicy {
  /// Delay before retry number `retry` (1 for the first retry).
  pub fn delay_for(&self, retry: u32) -> Duration {
    let retry = retry.max(1);
    let ms = match self.backoff {
      RetryBackoff::Constant => self.initial_delay_ms,
      RetryBackoff::Linear => self.initial_delay_ms.saturating_mul(retry as u64),
      RetryBackoff::Exponential => {
        let factor = 1u64 << (retry - 1).min(30);
        self.initial_delay_ms.saturating_mul(factor)
      }
    };
    Duration::from_millis(ms.min(self.max_delay_ms))
  }
}

/// Re-runs a failing inner task according to a [`RetryPolicy`].
///
/// Input errors (missing or invalid fields) are returned immediately since a
/// retry would see the same input.
pub struct RetryTask {
  inner: Arc<dyn Task>,
  policy: RetryPolicy,
  task_type: String,
}

impl RetryTask {
  /// Wrap `inner`, keeping its task type.
  pub fn new(inner: Arc<dyn Task>, policy: RetryPolicy) -> Self {
    let task_type = inner.task_type().to_string();
    Self {
      inner,
      policy,
      task_type,
    }
  }

  /// Register the wrapper under a different type than the inner task.
  pub fn named(mut self, task_type: impl Into<String>) -> Self {
    self.task_type = task_type.into();
    self
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }
}

fn is_retryable(error: &TaskError) -> bool {
  !matches!(
    error,
    TaskError::MissingInput { .. } | TaskError::InvalidInput { .. }
  )
}

#[async_trait]
impl Task for RetryTask {
  fn task_type(&self) -> &str {
    &self.task_type
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match self.inner.execute(input.clone(), ctx).await {
        Ok(output) => return Ok(output),
        Err(e) if attempt < attempts && is_retryable(&e) => {
          let delay = self.policy.delay_for(attempt);
          warn!(
            execution_id = %ctx.execution_id,
            node_id = %ctx.node_id,
            attempt,
            max_attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "task attempt failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    self.inner.validate(input)
  }

  fn schema(&self) -> Value {
    self.inner.schema()
  }

  fn display(&self) -> DisplayMetadata {
    let mut display = self.inner.display();
    if !display.tags.iter().any(|t| t == "retry") {
      display.tags.push("retry".to_string());
    }
    display
  }
}
