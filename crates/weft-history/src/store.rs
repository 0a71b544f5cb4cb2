use crate::types::ExecutionResult;

/// Storage for finished runs.
///
/// Implementations must be shareable between concurrently running
/// schedulers; every method takes `&self`.
pub trait ExecutionStore: Send + Sync {
  /// Record a run. It becomes the most recent entry.
  fn append(&self, result: ExecutionResult);

  /// The `limit` most recent runs, most recent first.
  fn recent(&self, limit: usize) -> Vec<ExecutionResult>;

  /// Get a run by execution ID.
  fn get(&self, execution_id: &str) -> Option<ExecutionResult>;

  /// The `limit` most recent runs of one workflow, most recent first.
  fn list_for_workflow(&self, workflow_id: &str, limit: usize) -> Vec<ExecutionResult>;

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
