use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::{Connection, Node};

/// An immutable workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  /// Schema version of the definition format.
  #[serde(default = "default_version")]
  pub version: String,
  #[serde(default = "Utc::now")]
  pub created_at: DateTime<Utc>,
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub connections: Vec<Connection>,
  /// Free-form tags, category, version labels.
  #[serde(default)]
  pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_version() -> String {
  "1".to_string()
}

impl WorkflowDef {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      description: String::new(),
      version: default_version(),
      created_at: Utc::now(),
      nodes: Vec::new(),
      connections: Vec::new(),
      metadata: serde_json::Map::new(),
    }
  }

  pub fn with_node(mut self, node: Node) -> Self {
    self.nodes.push(node);
    self
  }

  pub fn with_connection(mut self, connection: Connection) -> Self {
    self.connections.push(connection);
    self
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  /// Nodes whose type is the designated trigger kind.
  pub fn trigger_nodes<'a>(&'a self, trigger_type: &'a str) -> impl Iterator<Item = &'a Node> {
    self.nodes.iter().filter(move |n| n.task_type == trigger_type)
  }

  /// Build the graph structure without structural validation beyond
  /// endpoint resolution.
  pub fn graph(&self) -> Result<Graph, WorkflowError> {
    Graph::new(&self.nodes, &self.connections)
  }

  /// Run every pre-flight check and return the validated graph.
  ///
  /// Checks, in order: a trigger node exists, every task type is known,
  /// node ids are unique and connection endpoints exist, connection slots are
  /// declared, and the dependency graph is acyclic.
  pub fn validate<F>(&self, trigger_type: &str, is_known_type: F) -> Result<Graph, WorkflowError>
  where
    F: Fn(&str) -> bool,
  {
    if self.trigger_nodes(trigger_type).next().is_none() {
      return Err(WorkflowError::MissingTrigger {
        trigger_type: trigger_type.to_string(),
      });
    }

    if let Some(node) = self.nodes.iter().find(|n| !is_known_type(&n.task_type)) {
      return Err(WorkflowError::UnknownTaskType(node.task_type.clone()));
    }

    let graph = self.graph()?;

    for conn in &self.connections {
      // Endpoints were resolved by Graph::new, so both lookups succeed.
      if let Some(target) = self.get_node(&conn.target)
        && !target.has_input(&conn.target_input)
      {
        return Err(WorkflowError::UndeclaredInput {
          node_id: target.id.clone(),
          slot: conn.target_input.clone(),
        });
      }
      if let Some(source) = self.get_node(&conn.source)
        && !source.outputs.is_empty()
        && !source.has_output(&conn.source_output)
      {
        return Err(WorkflowError::UndeclaredOutput {
          node_id: source.id.clone(),
          slot: conn.source_output.clone(),
        });
      }
    }

    if let Some(node_id) = graph.find_cycle() {
      return Err(WorkflowError::CircularDependency(node_id.to_string()));
    }

    Ok(graph)
  }
}
