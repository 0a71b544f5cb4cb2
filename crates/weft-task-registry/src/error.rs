use thiserror::Error;

/// Errors that can occur when registering tasks.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// A task with this type name is already registered.
  #[error("duplicate type: task type '{0}' is already registered")]
  DuplicateType(String),

  /// The task reported a blank type name.
  #[error("task type name must not be empty")]
  EmptyType,

  /// Some tasks of a bulk registration failed; the rest were registered.
  #[error(
    "failed to register {count} task(s): {summary}",
    count = .failures.len(),
    summary = summarize(.failures)
  )]
  Bulk { failures: Vec<RegistryError> },
}

impl RegistryError {
  /// Type names that failed, for [`RegistryError::Bulk`]; the single
  /// offending name otherwise.
  pub fn failed_types(&self) -> Vec<&str> {
    match self {
      RegistryError::DuplicateType(name) => vec![name.as_str()],
      RegistryError::EmptyType => vec![""],
      RegistryError::Bulk { failures } => failures.iter().flat_map(|f| f.failed_types()).collect(),
    }
  }
}

fn summarize(failures: &[RegistryError]) -> String {
  failures
    .iter()
    .map(|f| f.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}
