//! Tasks that read and write the run's scratch data.

use async_trait::async_trait;
use serde_json::{Value, json};
use weft_task::{DisplayMetadata, ExecutionContext, Task, TaskError, ValidationResult};

use crate::fields::required_str;

fn key_check(input: &Value) -> ValidationResult {
  match input.get("key") {
    Some(Value::String(k)) if !k.is_empty() => ValidationResult::valid(),
    Some(_) => ValidationResult::invalid("'key' must be a non-empty string"),
    None => ValidationResult::invalid("'key' is required"),
  }
}

/// Writes `config.value` to scratch data under `config.key`.
///
/// Concurrent nodes writing the same key race; the last write wins.
#[derive(Debug, Clone, Default)]
pub struct SetTask;

#[async_trait]
impl Task for SetTask {
  fn task_type(&self) -> &str {
    "set"
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let key = required_str(&input, "key")?;
    let value = input.get("value").cloned().unwrap_or(Value::Null);
    let previous = ctx.data.set(key, value.clone());
    Ok(json!({ "key": key, "value": value, "previous": previous }))
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    key_check(input)
  }

  fn schema(&self) -> Value {
    json!({
      "type": "object",
      "properties": { "key": { "type": "string" }, "value": {} },
      "required": ["key"],
    })
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("data", "Set Value")
      .with_description("Stores a value in the run's shared data")
      .with_icon("save", "#2563eb")
      .with_tags(["state"])
  }
}

/// Reads `config.key` from scratch data, falling back to `config.default`.
#[derive(Debug, Clone, Default)]
pub struct GetTask;

#[async_trait]
impl Task for GetTask {
  fn task_type(&self) -> &str {
    "get"
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let key = required_str(&input, "key")?;
    let value = ctx
      .data
      .get(key)
      .or_else(|| input.get("default").cloned())
      .unwrap_or(Value::Null);
    Ok(json!({ "key": key, "value": value }))
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    key_check(input)
  }

  fn schema(&self) -> Value {
    json!({
      "type": "object",
      "properties": { "key": { "type": "string" }, "default": {} },
      "required": ["key"],
    })
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("data", "Get Value")
      .with_description("Reads a value from the run's shared data")
      .with_icon("download", "#2563eb")
      .with_tags(["state"])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_set_then_get() {
    let ctx = ExecutionContext::detached("exec", "node");

    let out = SetTask
      .execute(json!({ "key": "user", "value": "ada" }), &ctx)
      .await
      .unwrap();
    assert_eq!(out["previous"], Value::Null);
    assert_eq!(ctx.data.get("user"), Some(json!("ada")));

    let out = GetTask.execute(json!({ "key": "user" }), &ctx).await.unwrap();
    assert_eq!(out, json!({ "key": "user", "value": "ada" }));
  }

  #[tokio::test]
  async fn test_get_default() {
    let ctx = ExecutionContext::detached("exec", "node");
    let out = GetTask
      .execute(json!({ "key": "missing", "default": 0 }), &ctx)
      .await
      .unwrap();
    assert_eq!(out["value"], json!(0));
  }

  #[test]
  fn test_key_validation() {
    assert!(SetTask.validate(&json!({ "key": "k" })).is_valid);
    assert!(!SetTask.validate(&json!({ "key": "" })).is_valid);
    assert!(!GetTask.validate(&json!({ "key": 3 })).is_valid);
    assert!(!GetTask.validate(&json!({})).is_valid);
  }
}
