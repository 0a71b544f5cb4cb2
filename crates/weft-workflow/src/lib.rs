//! Weft Workflow
//!
//! This crate contains the declarative workflow types for weft and the
//! dependency graph derived from them.
//!
//! A [`WorkflowDef`] is an immutable description of a DAG: typed [`Node`]s
//! joined by [`Connection`]s that carry one output slot into one input slot.
//! [`WorkflowDef::validate`] performs every structural check that must pass
//! before a single task runs and returns the [`Graph`] used for scheduling.
//!
//! Definitions are plain serde values, so they can be loaded from JSON:
//!
//! ```json
//! {
//!   "id": "wf-1",
//!   "name": "fetch and store",
//!   "nodes": [
//!     { "id": "start", "type": "trigger", "outputs": ["out"] },
//!     { "id": "fetch", "type": "constant", "inputs": ["in"], "outputs": ["out"],
//!       "config": { "value": { "count": 5 } } }
//!   ],
//!   "connections": [
//!     { "source": "start", "source_output": "out", "target": "fetch", "target_input": "in" }
//!   ]
//! }
//! ```

mod error;
mod graph;
mod node;
mod workflow;

pub use error::WorkflowError;
pub use graph::Graph;
pub use node::{Connection, Node, Position};
pub use workflow::WorkflowDef;
