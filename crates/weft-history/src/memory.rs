//! In-memory execution history.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::store::ExecutionStore;
use crate::types::ExecutionResult;

/// Append-only, most-recent-first history held in process memory.
///
/// Grows without bound; callers bound what they read with `limit`.
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
  entries: RwLock<VecDeque<ExecutionResult>>,
}

impl MemoryExecutionStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ExecutionStore for MemoryExecutionStore {
  fn append(&self, result: ExecutionResult) {
    debug!(
      execution_id = %result.execution_id,
      status = ?result.status,
      "execution recorded"
    );
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    entries.push_front(result);
  }

  fn recent(&self, limit: usize) -> Vec<ExecutionResult> {
    let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
    entries.iter().take(limit).cloned().collect()
  }

  fn get(&self, execution_id: &str) -> Option<ExecutionResult> {
    let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
    entries
      .iter()
      .find(|r| r.execution_id == execution_id)
      .cloned()
  }

  fn list_for_workflow(&self, workflow_id: &str, limit: usize) -> Vec<ExecutionResult> {
    let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
    entries
      .iter()
      .filter(|r| r.workflow_id == workflow_id)
      .take(limit)
      .cloned()
      .collect()
  }

  fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
  }
}
