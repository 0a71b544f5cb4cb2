//! Input assembly for a node about to run.
//!
//! A node's input is a JSON object built in three layers:
//!
//! 1. The node's `config`. An object config is used as-is; any other config
//!    value is placed under `"config"`.
//! 2. String values in the config containing `{{ ... }}` are rendered with
//!    minijinja. The template context holds every input slot by name plus
//!    `results` (outputs of completed nodes) and `metadata` (the workflow's
//!    metadata):
//!    ```json
//!    { "greeting": "Hello {{ user.name | title }}!", "total": "{{ results.fetch.count }}" }
//!    ```
//!    A value that is a single `{{ expr }}` is parsed back into JSON when
//!    possible, so `"{{ results.fetch.count }}"` yields a number.
//! 3. Each declared input slot receives what its producers delivered, under
//!    the slot name. A slot fed by one connection gets that value; a slot fed
//!    by several gets an array in connection declaration order.
//!
//! A connection carries the producer's whole output when the producer
//! declares at most one output slot. Otherwise it carries the field of the
//! producer's output named by `source_output`.

use minijinja::{Environment, Value};
use serde_json::{Map, Value as Json};
use weft_task::ResultsView;
use weft_workflow::{Node, WorkflowDef};

use crate::error::SchedulerError;

/// Input key under which trigger nodes receive the run payload.
pub const PAYLOAD_KEY: &str = "payload";

/// Collect what each input slot of `node` receives from its producers.
///
/// Every producer must already have a recorded result.
pub(crate) fn gather_slots(
  workflow: &WorkflowDef,
  node: &Node,
  results: &ResultsView,
) -> Result<Map<String, Json>, SchedulerError> {
  let mut grouped: Vec<(&str, Vec<Json>)> = Vec::new();

  for conn in workflow.connections.iter().filter(|c| c.target == node.id) {
    let producer = workflow
      .get_node(&conn.source)
      .ok_or_else(|| assembly_error(node, format!("unknown producer '{}'", conn.source)))?;
    let output = results.get(&conn.source).ok_or_else(|| {
      assembly_error(
        node,
        format!("producer '{}' has no recorded output", conn.source),
      )
    })?;
    let value = carried_value(producer, output, &conn.source_output).ok_or_else(|| {
      assembly_error(
        node,
        format!(
          "output of '{}' has no field '{}'",
          conn.source, conn.source_output
        ),
      )
    })?;

    match grouped.iter_mut().find(|(slot, _)| *slot == conn.target_input) {
      Some((_, values)) => values.push(value),
      None => grouped.push((conn.target_input.as_str(), vec![value])),
    }
  }

  Ok(
    grouped
      .into_iter()
      .map(|(slot, mut values)| {
        let value = if values.len() == 1 {
          values.remove(0)
        } else {
          Json::Array(values)
        };
        (slot.to_string(), value)
      })
      .collect(),
  )
}

/// The value a connection delivers from a producer's output.
fn carried_value(producer: &Node, output: Json, source_output: &str) -> Option<Json> {
  if producer.outputs.len() <= 1 {
    return Some(output);
  }
  match output {
    Json::Object(mut fields) => fields.remove(source_output),
    _ => None,
  }
}

/// Build the input object for `node`.
///
/// `payload` is set only for trigger nodes.
pub(crate) fn assemble_input(
  node: &Node,
  slots: Map<String, Json>,
  results: &ResultsView,
  metadata: &Map<String, Json>,
  payload: Option<&Json>,
) -> Result<Json, SchedulerError> {
  let mut input = match &node.config {
    Json::Object(config) => config.clone(),
    Json::Null => Map::new(),
    other => {
      let mut wrapped = Map::new();
      wrapped.insert("config".to_string(), other.clone());
      wrapped
    }
  };

  if input.values().any(has_template) {
    let mut context = slots.clone();
    context.insert("results".to_string(), Json::Object(results.snapshot()));
    context.insert("metadata".to_string(), Json::Object(metadata.clone()));
    if let Some(payload) = payload {
      context.insert(PAYLOAD_KEY.to_string(), payload.clone());
    }
    let context = Value::from_serialize(&context);
    let env = Environment::new();

    for (key, value) in input.iter_mut() {
      *value = render_value(&env, node, key, value, &context)?;
    }
  }

  input.extend(slots);
  if let Some(payload) = payload {
    input.insert(PAYLOAD_KEY.to_string(), payload.clone());
  }

  Ok(Json::Object(input))
}

fn has_template(value: &Json) -> bool {
  match value {
    Json::String(s) => s.contains("{{"),
    Json::Array(items) => items.iter().any(has_template),
    Json::Object(fields) => fields.values().any(has_template),
    _ => false,
  }
}

/// Recursively render templates in a JSON value.
fn render_value(
  env: &Environment,
  node: &Node,
  key: &str,
  value: &Json,
  context: &Value,
) -> Result<Json, SchedulerError> {
  match value {
    Json::String(s) if s.contains("{{") => {
      let rendered = env.render_str(s, context).map_err(|e| {
        assembly_error(node, format!("failed to render config '{}': {}", key, e))
      })?;
      if is_pure_template(s)
        && let Ok(parsed) = serde_json::from_str(&rendered)
      {
        return Ok(parsed);
      }
      Ok(Json::String(rendered))
    }
    Json::Array(items) => items
      .iter()
      .map(|v| render_value(env, node, key, v, context))
      .collect::<Result<Vec<_>, _>>()
      .map(Json::Array),
    Json::Object(fields) => {
      let mut rendered = Map::new();
      for (k, v) in fields {
        rendered.insert(k.clone(), render_value(env, node, key, v, context)?);
      }
      Ok(Json::Object(rendered))
    }
    _ => Ok(value.clone()),
  }
}

/// Whether a string is exactly one `{{ expr }}`.
fn is_pure_template(s: &str) -> bool {
  let trimmed = s.trim();
  trimmed.starts_with("{{")
    && trimmed.ends_with("}}")
    && trimmed.matches("{{").count() == 1
    && trimmed.matches("}}").count() == 1
}

fn assembly_error(node: &Node, message: String) -> SchedulerError {
  SchedulerError::InputAssembly {
    node_id: node.id.clone(),
    message,
  }
}
