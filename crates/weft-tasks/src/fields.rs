//! Input field helpers shared by the built-in tasks.

use serde_json::Value;
use weft_task::TaskError;

/// Config keys read by the scheduler rather than the task.
const RESERVED: &[&str] = &["timeout_ms"];

pub(crate) fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, TaskError> {
  match input.get(field) {
    Some(Value::String(s)) => Ok(s),
    Some(_) => Err(TaskError::invalid(field, "expected a string")),
    None => Err(TaskError::missing(field)),
  }
}

pub(crate) fn optional_u64(input: &Value, field: &str) -> Result<Option<u64>, TaskError> {
  match input.get(field) {
    None | Some(Value::Null) => Ok(None),
    Some(v) => v
      .as_u64()
      .map(Some)
      .ok_or_else(|| TaskError::invalid(field, "expected a non-negative integer")),
  }
}

pub(crate) fn without_reserved(mut input: Value) -> Value {
  if let Value::Object(fields) = &mut input {
    for key in RESERVED {
      fields.remove(*key);
    }
  }
  input
}
