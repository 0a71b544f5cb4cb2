//! Weft Task
//!
//! The contract every executable unit implements, and the handles the
//! scheduler threads into each invocation.
//!
//! - [`Task`]: execute, validate, describe schema, describe display metadata.
//! - [`ExecutionContext`]: per-invocation identity, shared scratch [`ScratchData`],
//!   a read-only [`ResultsView`] of completed nodes, a [`Logger`] and an
//!   [`EventEmitter`].
//!
//! Concrete tasks that talk to external systems (key-value stores, object
//! storage, event buses) live outside this crate; they only need to implement
//! [`Task`].

mod context;
mod error;
mod events;
mod log;
mod task;

pub use context::{ExecutionContext, ResultsView, RunResults, ScratchData};
pub use error::{TaskError, TaskExecutionError};
pub use events::{
  ChannelEmitter, EmittedEvent, EventEmitter, ExecutionEvent, NoopEmitter, TracingEmitter,
};
pub use log::{LogLevel, Logger, NoopLogger, TracingLogger};
pub use task::{DisplayMetadata, Task, ValidationResult};
