use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Completed,
  Failed,
}

/// One error recorded against a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
  /// The failing node, if the error is attributable to one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
  pub message: String,
}

/// The immutable record of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub execution_id: String,
  pub workflow_id: String,
  pub status: ExecutionStatus,
  pub nodes_executed: usize,
  /// Output of every completed node, keyed by node id.
  pub results: serde_json::Map<String, serde_json::Value>,
  /// Scratch data as it stood when the run ended.
  pub data: serde_json::Map<String, serde_json::Value>,
  /// Empty for completed runs.
  pub errors: Vec<RunError>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub duration_ms: u64,
}

impl ExecutionResult {
  pub fn is_completed(&self) -> bool {
    self.status == ExecutionStatus::Completed
  }

  /// Output recorded for a node.
  pub fn output(&self, node_id: &str) -> Option<&serde_json::Value> {
    self.results.get(node_id)
  }
}
