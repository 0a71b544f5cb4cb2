//! Tasks that talk to the run's logger and event handle.

use async_trait::async_trait;
use serde_json::{Value, json};
use weft_task::{DisplayMetadata, ExecutionContext, LogLevel, Task, TaskError, ValidationResult};

use crate::fields::required_str;

/// Writes `config.message` to the run logger at `config.level` (default
/// info), with `config.data` attached.
#[derive(Debug, Clone, Default)]
pub struct LogTask;

fn level_of(input: &Value) -> Result<LogLevel, TaskError> {
  match input.get("level") {
    None | Some(Value::Null) => Ok(LogLevel::Info),
    Some(level) => serde_json::from_value(level.clone())
      .map_err(|_| TaskError::invalid("level", "expected one of debug, info, warn, error")),
  }
}

#[async_trait]
impl Task for LogTask {
  fn task_type(&self) -> &str {
    "log"
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let message = required_str(&input, "message")?;
    let level = level_of(&input)?;
    let data = input.get("data").cloned().unwrap_or(Value::Null);
    ctx.logger.log(level, message, data);
    Ok(json!({ "logged": message, "level": level }))
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    let mut errors = Vec::new();
    if !matches!(input.get("message"), Some(Value::String(_))) {
      errors.push("'message' must be a string".to_string());
    }
    if let Err(e) = level_of(input) {
      errors.push(e.to_string());
    }
    ValidationResult::from_errors(errors)
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("observability", "Log")
      .with_description("Writes a message to the run log")
      .with_icon("file-text", "#6b7280")
      .with_tags(["debug"])
  }
}

/// Emits `config.event` with `config.payload` through the run's event handle.
#[derive(Debug, Clone, Default)]
pub struct EmitTask;

#[async_trait]
impl Task for EmitTask {
  fn task_type(&self) -> &str {
    "emit"
  }

  async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, TaskError> {
    let event = required_str(&input, "event")?;
    let payload = input.get("payload").cloned().unwrap_or_else(|| json!({}));
    ctx.events.emit(event, payload);
    Ok(json!({ "emitted": event }))
  }

  fn validate(&self, input: &Value) -> ValidationResult {
    match input.get("event") {
      Some(Value::String(e)) if !e.is_empty() => ValidationResult::valid(),
      _ => ValidationResult::invalid("'event' must be a non-empty string"),
    }
  }

  fn display(&self) -> DisplayMetadata {
    DisplayMetadata::new("observability", "Emit Event")
      .with_description("Publishes a custom event")
      .with_icon("radio", "#7c3aed")
      .with_tags(["events"])
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use weft_task::{ChannelEmitter, Logger};

  #[derive(Default)]
  struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
  }

  impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, _data: Value) {
      self.lines.lock().unwrap().push((level, message.to_string()));
    }
  }

  #[tokio::test]
  async fn test_log_uses_context_logger() {
    let logger = Arc::new(RecordingLogger::default());
    let mut ctx = ExecutionContext::detached("exec", "node");
    ctx.logger = logger.clone();

    LogTask
      .execute(json!({ "message": "hello", "level": "warn" }), &ctx)
      .await
      .unwrap();

    let lines = logger.lines.lock().unwrap();
    assert_eq!(lines.as_slice(), &[(LogLevel::Warn, "hello".to_string())]);
  }

  #[test]
  fn test_log_rejects_unknown_level() {
    let check = LogTask.validate(&json!({ "message": "x", "level": "loud" }));
    assert!(!check.is_valid);
  }

  #[tokio::test]
  async fn test_emit_forwards_event() {
    let (emitter, mut rx) = ChannelEmitter::channel();
    let mut ctx = ExecutionContext::detached("exec", "node");
    ctx.events = Arc::new(emitter);

    EmitTask
      .execute(json!({ "event": "order.placed", "payload": { "id": 3 } }), &ctx)
      .await
      .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name, "order.placed");
    assert_eq!(event.payload, json!({ "id": 3 }));
  }
}
