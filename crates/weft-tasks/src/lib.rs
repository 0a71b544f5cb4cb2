//! Weft Tasks
//!
//! Built-in task implementations:
//!
//! | type          | does                                              |
//! |---------------|---------------------------------------------------|
//! | `trigger`     | outputs the run payload                           |
//! | `constant`    | outputs `config.value`                            |
//! | `passthrough` | outputs its input                                 |
//! | `delay`       | waits `config.ms`, then forwards its input        |
//! | `fail`        | fails with `config.message`                       |
//! | `set` / `get` | writes / reads the run's scratch data             |
//! | `log`         | writes to the run logger                          |
//! | `emit`        | publishes a custom event                          |
//!
//! [`RetryTask`] wraps any task with a retry policy.

mod basic;
mod data;
mod fields;
mod retry;
mod signal;

use std::sync::Arc;

use weft_task::Task;
use weft_task_registry::{RegistryError, TaskRegistry};

pub use basic::{ConstantTask, DelayTask, FailTask, PassthroughTask, TriggerTask};
pub use data::{GetTask, SetTask};
pub use retry::{RetryBackoff, RetryPolicy, RetryTask};
pub use signal::{EmitTask, LogTask};

/// One instance of every built-in task.
pub fn builtin_tasks() -> Vec<Arc<dyn Task>> {
  vec![
    Arc::new(TriggerTask),
    Arc::new(ConstantTask),
    Arc::new(PassthroughTask),
    Arc::new(DelayTask),
    Arc::new(FailTask),
    Arc::new(SetTask),
    Arc::new(GetTask),
    Arc::new(LogTask),
    Arc::new(EmitTask),
  ]
}

/// A registry holding every built-in task.
pub fn builtin_registry() -> Result<TaskRegistry, RegistryError> {
  let mut registry = TaskRegistry::new();
  registry.register_many(builtin_tasks())?;
  Ok(registry)
}
