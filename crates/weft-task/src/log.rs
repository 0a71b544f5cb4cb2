//! Logger handle passed to tasks.
//!
//! Logging never fails from the caller's point of view: implementations
//! swallow their own errors so a broken sink cannot abort a run.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Debug,
  Info,
  Warn,
  Error,
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Warn => "warn",
      LogLevel::Error => "error",
    };
    f.write_str(s)
  }
}

/// Structured logger with four severities.
pub trait Logger: Send + Sync {
  fn log(&self, level: LogLevel, message: &str, data: serde_json::Value);

  fn debug(&self, message: &str, data: serde_json::Value) {
    self.log(LogLevel::Debug, message, data);
  }

  fn info(&self, message: &str, data: serde_json::Value) {
    self.log(LogLevel::Info, message, data);
  }

  fn warn(&self, message: &str, data: serde_json::Value) {
    self.log(LogLevel::Warn, message, data);
  }

  fn error(&self, message: &str, data: serde_json::Value) {
    self.log(LogLevel::Error, message, data);
  }
}

/// Forwards task logs to `tracing`, tagged with the run and node ids.
#[derive(Debug, Clone)]
pub struct TracingLogger {
  execution_id: String,
  node_id: String,
}

impl TracingLogger {
  pub fn new(execution_id: impl Into<String>, node_id: impl Into<String>) -> Self {
    Self {
      execution_id: execution_id.into(),
      node_id: node_id.into(),
    }
  }
}

impl Logger for TracingLogger {
  fn log(&self, level: LogLevel, message: &str, data: serde_json::Value) {
    let execution_id = self.execution_id.as_str();
    let node_id = self.node_id.as_str();
    match level {
      LogLevel::Debug => debug!(%execution_id, %node_id, %data, "{}", message),
      LogLevel::Info => info!(%execution_id, %node_id, %data, "{}", message),
      LogLevel::Warn => warn!(%execution_id, %node_id, %data, "{}", message),
      LogLevel::Error => error!(%execution_id, %node_id, %data, "{}", message),
    }
  }
}

/// Discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
  fn log(&self, _level: LogLevel, _message: &str, _data: serde_json::Value) {}
}
