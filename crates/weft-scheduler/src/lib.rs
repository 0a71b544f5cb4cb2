//! Weft Scheduler
//!
//! Validates a workflow definition, then executes its nodes in dependency
//! order. A node starts as soon as its last producer completes, so independent
//! branches run concurrently on the tokio runtime. The first node failure
//! fails the run; nodes not yet started never start.
//!
//! Every run that gets past validation is recorded in the injected
//! [`weft_history::ExecutionStore`] and reported through the injected
//! [`weft_task::EventEmitter`]:
//!
//! ```text
//! workflow.started
//!   node.started / node.completed   (interleaved across branches)
//! workflow.completed                (or node.failed + workflow.failed)
//! ```
//!
//! See [`input`] for how each node's input is assembled.

mod config;
mod error;
pub mod input;
mod scheduler;

pub use config::{DEFAULT_TRIGGER_TYPE, SchedulerConfig};
pub use error::SchedulerError;
pub use input::PAYLOAD_KEY;
pub use scheduler::WorkflowScheduler;
pub use weft_history::{ExecutionResult, ExecutionStatus, RunError};
