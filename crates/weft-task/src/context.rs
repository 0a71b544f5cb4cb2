//! Per-invocation execution context.

use std::sync::Arc;

use dashmap::DashMap;

use crate::events::EventEmitter;
use crate::log::Logger;

/// Mutable key/value scratch space shared by every node of one run.
///
/// Individual reads and writes are atomic per key, but nothing orders writes
/// across nodes: two concurrently running nodes writing the same key race and
/// the last write wins. Workflows that need ordering must express it with
/// connections.
#[derive(Debug, Clone, Default)]
pub struct ScratchData {
  inner: Arc<DashMap<String, serde_json::Value>>,
}

impl ScratchData {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<serde_json::Value> {
    self.inner.get(key).map(|v| v.value().clone())
  }

  /// Store a value, returning the previous one.
  pub fn set(&self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
    self.inner.insert(key.into(), value)
  }

  pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
    self.inner.remove(key).map(|(_, v)| v)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inner.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  /// Point-in-time copy, ordered by key.
  pub fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
    let mut entries: Vec<(String, serde_json::Value)> = self
      .inner
      .iter()
      .map(|e| (e.key().clone(), e.value().clone()))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
  }
}

/// Outputs of completed nodes for one run, keyed by node id.
///
/// Owned by the scheduler, which is the only writer. Tasks see it through
/// [`ResultsView`].
#[derive(Debug, Clone, Default)]
pub struct RunResults {
  inner: Arc<DashMap<String, serde_json::Value>>,
}

impl RunResults {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a completed node's output.
  pub fn record(&self, node_id: impl Into<String>, output: serde_json::Value) {
    self.inner.insert(node_id.into(), output);
  }

  /// A read-only handle onto the same results.
  pub fn view(&self) -> ResultsView {
    ResultsView {
      inner: self.inner.clone(),
    }
  }
}

/// Read-only view of completed nodes' outputs.
#[derive(Debug, Clone, Default)]
pub struct ResultsView {
  inner: Arc<DashMap<String, serde_json::Value>>,
}

impl ResultsView {
  pub fn get(&self, node_id: &str) -> Option<serde_json::Value> {
    self.inner.get(node_id).map(|v| v.value().clone())
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.inner.contains_key(node_id)
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  /// Point-in-time copy, ordered by node id.
  pub fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
    let mut entries: Vec<(String, serde_json::Value)> = self
      .inner
      .iter()
      .map(|e| (e.key().clone(), e.value().clone()))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
  }
}

/// Everything a task receives besides its input.
#[derive(Clone)]
pub struct ExecutionContext {
  /// Shared by every node of the run.
  pub execution_id: String,
  /// The node being executed.
  pub node_id: String,
  pub workflow_id: String,
  pub logger: Arc<dyn Logger>,
  pub events: Arc<dyn EventEmitter>,
  /// The workflow definition's metadata map.
  pub metadata: Arc<serde_json::Map<String, serde_json::Value>>,
  pub data: ScratchData,
  pub results: ResultsView,
}

impl std::fmt::Debug for ExecutionContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("execution_id", &self.execution_id)
      .field("node_id", &self.node_id)
      .field("workflow_id", &self.workflow_id)
      .field("data_keys", &self.data.len())
      .field("results", &self.results.len())
      .finish()
  }
}

impl ExecutionContext {
  /// A context with no-op logging and events, for running a task outside a
  /// scheduler (tests, single-node debugging).
  pub fn detached(execution_id: impl Into<String>, node_id: impl Into<String>) -> Self {
    Self {
      execution_id: execution_id.into(),
      node_id: node_id.into(),
      workflow_id: String::new(),
      logger: Arc::new(crate::log::NoopLogger),
      events: Arc::new(crate::events::NoopEmitter),
      metadata: Arc::new(serde_json::Map::new()),
      data: ScratchData::new(),
      results: ResultsView::default(),
    }
  }
}
