use serde::{Deserialize, Serialize};

/// Default task type that marks a node as a trigger.
pub const DEFAULT_TRIGGER_TYPE: &str = "trigger";

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Task type identifying trigger nodes. A workflow needs at least one.
  pub trigger_type: String,
  /// Bound on a node's `execute` when its config sets no `timeout_ms`.
  /// `None` means unbounded.
  pub default_node_timeout_ms: Option<u64>,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      trigger_type: DEFAULT_TRIGGER_TYPE.to_string(),
      default_node_timeout_ms: None,
    }
  }
}
