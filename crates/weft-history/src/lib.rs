//! Weft History
//!
//! The shape of a finished run ([`ExecutionResult`]) and where finished runs
//! are kept.
//!
//! The [`ExecutionStore`] trait defines operations for:
//! - Appending a finished run
//! - Listing the most recent runs, overall or per workflow
//! - Looking a run up by execution id
//!
//! [`MemoryExecutionStore`] is the in-process implementation. It has no
//! eviction policy.

mod memory;
mod store;
mod types;

pub use memory::MemoryExecutionStore;
pub use store::ExecutionStore;
pub use types::{ExecutionResult, ExecutionStatus, RunError};
