use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use weft_task::{Task, ValidationResult};

use crate::error::RegistryError;

/// The registry's record for one task type.
#[derive(Clone)]
pub struct TaskRegistration {
  pub task: Arc<dyn Task>,
  pub category: String,
  pub required_integration: Option<String>,
  pub tags: Vec<String>,
}

impl TaskRegistration {
  fn new(task: Arc<dyn Task>) -> Self {
    let display = task.display();
    Self {
      task,
      category: display.category,
      required_integration: display.required_integration,
      tags: display.tags,
    }
  }
}

impl std::fmt::Debug for TaskRegistration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskRegistration")
      .field("task_type", &self.task.task_type())
      .field("category", &self.category)
      .field("required_integration", &self.required_integration)
      .field("tags", &self.tags)
      .finish()
  }
}

/// Criteria for [`TaskRegistry::filter`]. Every supplied criterion must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub integration: Option<String>,
  /// The task must carry all of these tags (case-insensitive).
  #[serde(default)]
  pub tags: Vec<String>,
}

/// Lookup table from task type name to implementation.
///
/// Built once at startup and then shared read-only (usually as
/// `Arc<TaskRegistry>`) with the scheduler. Secondary indexes are kept in
/// sorted maps so listing operations are deterministic.
#[derive(Debug, Default)]
pub struct TaskRegistry {
  tasks: HashMap<String, TaskRegistration>,
  by_category: BTreeMap<String, BTreeSet<String>>,
  by_integration: BTreeMap<String, BTreeSet<String>>,
  /// Lowercased tag -> type names.
  by_tag: BTreeMap<String, BTreeSet<String>>,
}

impl TaskRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register one task under its own type name.
  pub fn register(&mut self, task: Arc<dyn Task>) -> Result<(), RegistryError> {
    let task_type = task.task_type().to_string();
    if task_type.trim().is_empty() {
      return Err(RegistryError::EmptyType);
    }
    if self.tasks.contains_key(&task_type) {
      return Err(RegistryError::DuplicateType(task_type));
    }

    let registration = TaskRegistration::new(task);

    self
      .by_category
      .entry(registration.category.clone())
      .or_default()
      .insert(task_type.clone());
    if let Some(integration) = &registration.required_integration {
      self
        .by_integration
        .entry(integration.clone())
        .or_default()
        .insert(task_type.clone());
    }
    for tag in &registration.tags {
      self
        .by_tag
        .entry(tag.to_lowercase())
        .or_default()
        .insert(task_type.clone());
    }

    debug!(task_type = %task_type, category = %registration.category, "task registered");
    self.tasks.insert(task_type, registration);
    Ok(())
  }

  /// Register a batch of tasks.
  ///
  /// Every task that can be registered is, even when others fail. Failures
  /// are reported together as [`RegistryError::Bulk`]. Returns the number of
  /// tasks registered.
  pub fn register_many<I>(&mut self, tasks: I) -> Result<usize, RegistryError>
  where
    I: IntoIterator<Item = Arc<dyn Task>>,
  {
    let mut registered = 0;
    let mut failures = Vec::new();

    for task in tasks {
      match self.register(task) {
        Ok(()) => registered += 1,
        Err(e) => {
          warn!(error = %e, "task registration failed");
          failures.push(e);
        }
      }
    }

    if failures.is_empty() {
      Ok(registered)
    } else {
      Err(RegistryError::Bulk { failures })
    }
  }

  pub fn get(&self, task_type: &str) -> Option<Arc<dyn Task>> {
    self.tasks.get(task_type).map(|r| r.task.clone())
  }

  /// Full registration record, including indexed metadata.
  pub fn registration(&self, task_type: &str) -> Option<&TaskRegistration> {
    self.tasks.get(task_type)
  }

  pub fn has(&self, task_type: &str) -> bool {
    self.tasks.contains_key(task_type)
  }

  /// All registered type names, sorted.
  pub fn all_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self.tasks.keys().cloned().collect();
    types.sort();
    types
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn by_category(&self, category: &str) -> Vec<Arc<dyn Task>> {
    self.resolve(self.by_category.get(category))
  }

  pub fn all_categories(&self) -> Vec<String> {
    self.by_category.keys().cloned().collect()
  }

  pub fn count_by_category(&self) -> BTreeMap<String, usize> {
    self
      .by_category
      .iter()
      .map(|(category, types)| (category.clone(), types.len()))
      .collect()
  }

  pub fn by_required_integration(&self, integration: &str) -> Vec<Arc<dyn Task>> {
    self.resolve(self.by_integration.get(integration))
  }

  pub fn all_integrations(&self) -> Vec<String> {
    self.by_integration.keys().cloned().collect()
  }

  /// Case-insensitive substring match against type name, label and tags.
  pub fn search(&self, query: &str) -> Vec<Arc<dyn Task>> {
    let needle = query.to_lowercase();

    let mut matches: BTreeSet<&str> = self
      .by_tag
      .iter()
      .filter(|(tag, _)| tag.contains(&needle))
      .flat_map(|(_, types)| types.iter().map(String::as_str))
      .collect();
    matches.extend(
      self
        .tasks
        .iter()
        .filter(|(task_type, registration)| {
          task_type.to_lowercase().contains(&needle)
            || registration
              .task
              .display()
              .label
              .to_lowercase()
              .contains(&needle)
        })
        .map(|(task_type, _)| task_type.as_str()),
    );
    matches.into_iter().filter_map(|t| self.get(t)).collect()
  }

  /// Tasks matching every supplied criterion, sorted by type name.
  pub fn filter(&self, filter: &TaskFilter) -> Vec<Arc<dyn Task>> {
    let none = BTreeSet::new();
    let mut sets: Vec<&BTreeSet<String>> = Vec::new();
    if let Some(category) = &filter.category {
      sets.push(self.by_category.get(category).unwrap_or(&none));
    }
    if let Some(integration) = &filter.integration {
      sets.push(self.by_integration.get(integration).unwrap_or(&none));
    }
    for tag in &filter.tags {
      sets.push(self.by_tag.get(&tag.to_lowercase()).unwrap_or(&none));
    }

    let matches: Vec<&str> = match sets.split_first() {
      None => {
        let mut all: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        all.sort_unstable();
        all
      }
      Some((first, rest)) => first
        .iter()
        .filter(|t| rest.iter().all(|set| set.contains(*t)))
        .map(String::as_str)
        .collect(),
    };
    matches.into_iter().filter_map(|t| self.get(t)).collect()
  }

  /// Remove a task and its index entries. Returns whether it was present.
  pub fn unregister(&mut self, task_type: &str) -> bool {
    let Some(registration) = self.tasks.remove(task_type) else {
      return false;
    };

    remove_from_index(&mut self.by_category, &registration.category, task_type);
    if let Some(integration) = &registration.required_integration {
      remove_from_index(&mut self.by_integration, integration, task_type);
    }
    for tag in &registration.tags {
      remove_from_index(&mut self.by_tag, &tag.to_lowercase(), task_type);
    }
    true
  }

  pub fn clear(&mut self) {
    self.tasks.clear();
    self.by_category.clear();
    self.by_integration.clear();
    self.by_tag.clear();
  }

  /// Developer-time consistency check over every registration.
  ///
  /// Flags registrations whose key disagrees with the task's own type name,
  /// blank labels or categories, non-object schemas, and index entries that
  /// point at unregistered types. Not run by the scheduler.
  pub fn validate(&self) -> ValidationResult {
    let mut errors = Vec::new();

    for task_type in self.all_types() {
      let registration = &self.tasks[&task_type];
      let task = &registration.task;

      if task.task_type() != task_type {
        errors.push(format!(
          "task registered as '{}' reports type '{}'",
          task_type,
          task.task_type()
        ));
      }

      let display = task.display();
      if display.label.trim().is_empty() {
        errors.push(format!("task '{}' has an empty display label", task_type));
      }
      if registration.category.trim().is_empty() {
        errors.push(format!("task '{}' has an empty category", task_type));
      }
      if !task.schema().is_object() {
        errors.push(format!("task '{}' schema is not a JSON object", task_type));
      }
    }

    let indexes = [
      ("category", &self.by_category),
      ("integration", &self.by_integration),
      ("tag", &self.by_tag),
    ];
    for (index_name, index) in indexes {
      for (key, types) in index {
        for task_type in types.iter().filter(|t| !self.tasks.contains_key(*t)) {
          errors.push(format!(
            "{} index '{}' references unregistered task '{}'",
            index_name, key, task_type
          ));
        }
      }
    }

    ValidationResult::from_errors(errors)
  }

  fn resolve(&self, types: Option<&BTreeSet<String>>) -> Vec<Arc<dyn Task>> {
    types
      .map(|types| types.iter().filter_map(|t| self.get(t)).collect())
      .unwrap_or_default()
  }
}

fn remove_from_index(index: &mut BTreeMap<String, BTreeSet<String>>, key: &str, task_type: &str) {
  if let Some(types) = index.get_mut(key) {
    types.remove(task_type);
    if types.is_empty() {
      index.remove(key);
    }
  }
}
