//! Weft Task Registry
//!
//! Maps task type names to [`weft_task::Task`] implementations, with secondary
//! indexes by category, required integration and tag.
//!
//! The registry is an ordinary value: construct one, register tasks, then
//! share it (typically as `Arc<TaskRegistry>`) with a scheduler. Several
//! registries can coexist, e.g. one per tenant or per test.

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{TaskFilter, TaskRegistration, TaskRegistry};
