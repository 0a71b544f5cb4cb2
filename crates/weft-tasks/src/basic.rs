//! Tasks that shape values: trigger, constant, passthrough, delay and fail.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use weft_task::{DisplayMetadata, ExecutionContext, Task, TaskError, ValidationResult};

use crate::fields::{optional_u64, without_reserved};

/// Entry point of a workflow. Outputs the run payload.
#[derive(Debug, Clone, Default)]
pub struct TriggerTask;

#[async_trait]
impl Task for TriggerTask {
  fn task_type(&self) -> &str {
    "trigger"
  }

  async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    Ok(input.get("payload").cloned().unwrap_or_else(|| json!({})))
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("triggers", "Trigger")
      .with_description("Starts a workflow and outputs the run payload")
      .with_icon("play", "#16a34a")
      .with_tags(["entry", "core"])
  }
}

/// Outputs `config.value`.
#[derive(Debug, Clone, Default)]
pub struct ConstantTask;

#[async_trait]
impl Task for ConstantTask {
  fn task_type(&self) -> &str {
    "constant"
  }

  async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    input
      .get("value")
      .cloned()
      .ok_or_else(|| TaskError::missing("value"))
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    if input.get("value").is_some() {
      ValidationResult::valid()
    } else {
      ValidationResult::invalid("constant requires a 'value'")
    }
  }

  fn schema(&self) -> Value {
    json!({
      "type": "object",
      "properties": { "value": {} },
      "required": ["value"],
    })
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("data", "Constant")
      .with_description("Outputs a fixed value")
      .with_icon("hash", "#64748b")
      .with_tags(["core"])
  }
}

/// Outputs its assembled input unchanged, minus scheduler settings.
#[derive(Debug, Clone, Default)]
pub struct PassthroughTask;

#[async_trait]
impl Task for PassthroughTask {
  fn task_type(&self) -> &str {
    "passthrough"
  }

  async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    Ok(without_reserved(input))
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("flow", "Passthrough")
      .with_description("Forwards its input; useful as a join point")
      .with_icon("arrow-right", "#64748b")
      .with_tags(["core", "join"])
  }
}

/// Sleeps for `config.ms` milliseconds, then forwards its input.
#[derive(Debug, Clone, Default)]
pub struct DelayTask;

#[async_trait]
impl Task for DelayTask {
  fn task_type(&self) -> &str {
    "delay"
  }

  async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let ms = optional_u64(&input, "ms")?.ok_or_else(|| TaskError::missing("ms"))?;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    let mut output = without_reserved(input);
    if let Value::Object(fields) = &mut output {
      fields.remove("ms");
    }
    Ok(output)
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    match input.get("ms") {
      Some(v) if v.is_u64() => ValidationResult::valid(),
      Some(_) => ValidationResult::invalid("'ms' must be a non-negative integer"),
      None => ValidationResult::invalid("delay requires 'ms'"),
    }
  }

  fn schema(&self) -> Value {
    json!({
      "type": "object",
      "properties": { "ms": { "type": "integer", "minimum": 0 } },
      "required": ["ms"],
    })
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("flow", "Delay")
      .with_description("Waits before continuing")
      .with_icon("clock", "#f59e0b")
      .with_tags(["timing"])
  }
}

/// Always fails with `config.message`.
#[derive(Debug, Clone, Default)]
pub struct FailTask;

#[async_trait]
impl Task for FailTask {
  fn task_type(&self) -> &str {
    "fail"
  }

  async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let message = input
      .get("message")
      .and_then(Value::as_str)
      .unwrap_or("fail task invoked");
    Err(TaskError::failed(message))
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("flow", "Fail")
      .with_description("Stops the run with an error")
      .with_icon("x-circle", "#dc2626")
      .with_tags(["testing"])
  }
}
