//! Task records and the task manager.
//!
//! Tasks are kept in insertion order in `tasks.json`. Priority runs from 1
//! (high) to 3 (low); status is one of `not_started`, `in_progress` or
//! `completed`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::record::{self, Record, RecordKind};
use crate::store::EntityStore;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 3;
pub const DEFAULT_PRIORITY: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Next status in the not_started -> in_progress -> completed cycle
    pub fn next(self) -> Self {
        match self {
            TaskStatus::NotStarted => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NotStarted,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "not_started" => Ok(TaskStatus::NotStarted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(Error::Validation(format!(
                "invalid status '{}' (expected not_started|in_progress|completed)",
                value.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    #[serde(default = "record::now", deserialize_with = "record::lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "record::now", deserialize_with = "record::lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Task {
    const KIND: RecordKind = RecordKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("task id cannot be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title cannot be empty".to_string()));
        }
        validate_priority(self.priority)?;
        record::check_timestamps(Self::KIND, self.created_at, self.updated_at)
    }
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Stored statuses outside the known set fall back to `not_started`
fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(status = %value, "unknown task status, using not_started");
            TaskStatus::NotStarted
        }),
        None => TaskStatus::NotStarted,
    })
}

pub fn validate_priority(priority: u8) -> Result<u8> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(priority)
    } else {
        Err(Error::Validation(format!(
            "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY} (got {priority})"
        )))
    }
}

/// Parse a priority given as text (`1`-`3`, or `high`/`medium`/`low`)
pub fn parse_priority(value: &str) -> Result<u8> {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "high" => Ok(1),
        "medium" => Ok(2),
        "low" => Ok(3),
        other => other
            .parse::<u8>()
            .map_err(|_| Error::Validation(format!("invalid priority '{trimmed}'")))
            .and_then(validate_priority),
    }
}

pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "high",
        2 => "medium",
        3 => "low",
        _ => "unknown",
    }
}

fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Fields for a new task; unset priority/status take the configured defaults
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Option<u8>,
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update; only the fields that are `Some` change
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<u8>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.priority.map_or(true, |priority| task.priority == priority)
    }
}

/// Values applied to new tasks when the caller leaves them unset
#[derive(Debug, Clone, Copy)]
pub struct TaskDefaults {
    pub priority: u8,
    pub status: TaskStatus,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            status: TaskStatus::NotStarted,
        }
    }
}

pub struct TaskManager {
    store: EntityStore<Task>,
    defaults: TaskDefaults,
}

impl TaskManager {
    pub fn open(path: impl Into<PathBuf>, defaults: TaskDefaults) -> Self {
        let mut store = EntityStore::open(path);
        store.normalize(|tasks| repair_timestamps(tasks));
        Self { store, defaults }
    }

    pub fn defaults(&self) -> TaskDefaults {
        self.defaults
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.records()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn add_task(&mut self, input: NewTask) -> Result<Task> {
        let title = normalize_title(&input.title)?;
        let priority = validate_priority(input.priority.unwrap_or(self.defaults.priority))?;
        let status = input.status.unwrap_or(self.defaults.status);

        let mut id = record::new_id();
        while self.store.contains(&id) {
            id = record::new_id();
        }

        let now = record::now();
        let task = self.store.add(Task {
            id,
            title,
            description: input.description,
            priority,
            status,
            created_at: now,
            updated_at: now,
        })?;
        tracing::info!(id = %task.id, title = %task.title, "task added");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.store.get(id).cloned()
    }

    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        let task = self.store.update(id, |task| {
            if let Some(title) = update.title.as_deref() {
                task.title = normalize_title(title)?;
            }
            if let Some(description) = update.description {
                task.description = description;
            }
            if let Some(priority) = update.priority {
                task.priority = validate_priority(priority)?;
            }
            if let Some(status) = update.status {
                task.status = status;
            }
            task.updated_at = record::next_timestamp(task.updated_at);
            Ok(())
        })?;
        tracing::info!(id = %task.id, "task updated");
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        let task = self.store.delete(id)?;
        tracing::info!(id = %task.id, "task deleted");
        Ok(task)
    }

    /// Tasks matching `filter`, in insertion order
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.store.list(|task| filter.matches(task))
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.store.replace_all(tasks)
    }

    pub fn save(&self) -> Result<()> {
        self.store.save()
    }

    pub fn reload(&mut self) {
        self.store.reload();
        self.store.normalize(|tasks| repair_timestamps(tasks));
    }
}

/// Stored tasks updated "before" they were created are treated as never updated
fn repair_timestamps(tasks: &mut [Task]) {
    for task in tasks.iter_mut().filter(|task| task.updated_at < task.created_at) {
        task.updated_at = task.created_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> TaskManager {
        TaskManager::open(temp.path().join("tasks.json"), TaskDefaults::default())
    }

    #[test]
    fn add_task_assigns_identity_and_defaults() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);

        let first = tasks.add_task(NewTask::titled("  Write docs ")).unwrap();
        let second = tasks.add_task(NewTask::titled("Write docs")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.title, "Write docs");
        assert_eq!(first.priority, DEFAULT_PRIORITY);
        assert_eq!(first.status, TaskStatus::NotStarted);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[test]
    fn add_task_rejects_bad_fields() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);

        assert!(matches!(
            tasks.add_task(NewTask::titled("   ")),
            Err(Error::Validation(_))
        ));
        let mut input = NewTask::titled("ok");
        input.priority = Some(4);
        assert!(matches!(tasks.add_task(input), Err(Error::Validation(_))));
        assert!(tasks.is_empty());
    }

    #[test]
    fn update_merges_and_bumps_timestamp() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);
        let mut input = NewTask::titled("Ship");
        input.description = "v1".to_string();
        input.priority = Some(2);
        let task = tasks.add_task(input).unwrap();

        let updated = tasks
            .update_task(&task.id, TaskUpdate::status(TaskStatus::InProgress))
            .unwrap();

        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.title, "Ship");
        assert_eq!(updated.description, "v1");
        assert_eq!(updated.priority, 2);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at > task.updated_at);
    }

    #[test]
    fn update_with_invalid_field_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);
        let task = tasks.add_task(NewTask::titled("Keep")).unwrap();

        let update = TaskUpdate {
            title: Some("New title".to_string()),
            priority: Some(9),
            ..TaskUpdate::default()
        };
        assert!(matches!(
            tasks.update_task(&task.id, update),
            Err(Error::Validation(_))
        ));
        assert_eq!(tasks.get_task(&task.id).unwrap(), task);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);
        tasks.add_task(NewTask::titled("A")).unwrap();
        let before = tasks.tasks().to_vec();

        assert!(matches!(tasks.get_task("nope"), Err(Error::NotFound { .. })));
        assert!(matches!(
            tasks.update_task("nope", TaskUpdate::status(TaskStatus::Completed)),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(tasks.delete_task("nope"), Err(Error::NotFound { .. })));
        assert_eq!(tasks.tasks(), before.as_slice());
    }

    #[test]
    fn list_filters_by_status_and_priority() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);
        let a = tasks.add_task(NewTask::titled("A")).unwrap();
        let mut input = NewTask::titled("B");
        input.priority = Some(3);
        input.status = Some(TaskStatus::Completed);
        let b = tasks.add_task(input).unwrap();
        tasks.add_task(NewTask::titled("C")).unwrap();

        let all = tasks.list_tasks(&TaskFilter::default());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, a.id);

        let done = tasks.list_tasks(&TaskFilter {
            status: Some(TaskStatus::Completed),
            priority: None,
        });
        assert_eq!(done, vec![b.clone()]);

        let high = tasks.list_tasks(&TaskFilter {
            status: None,
            priority: Some(1),
        });
        assert_eq!(high.len(), 2);
    }

    #[test]
    fn delete_returns_removed_task_and_persists() {
        let temp = TempDir::new().unwrap();
        let mut tasks = manager(&temp);
        let task = tasks.add_task(NewTask::titled("Gone")).unwrap();

        assert_eq!(tasks.delete_task(&task.id).unwrap(), task);
        let reopened = manager(&temp);
        assert!(reopened.is_empty());
    }

    #[test]
    fn status_parsing_is_forgiving_about_separators() {
        assert_eq!(
            "In-Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "not started".parse::<TaskStatus>().unwrap(),
            TaskStatus::NotStarted
        );
        assert!("blocked".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::Completed.next(), TaskStatus::NotStarted);
    }

    #[test]
    fn priority_parsing_accepts_names() {
        assert_eq!(parse_priority("high").unwrap(), 1);
        assert_eq!(parse_priority(" 3 ").unwrap(), 3);
        assert!(parse_priority("0").is_err());
        assert!(parse_priority("urgent").is_err());
    }

    #[test]
    fn loads_records_written_with_naive_timestamps() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id":"t1","title":"Old","description":"","priority":2,
                "status":"waiting","created_at":"2025-04-08T09:00:00.123456",
                "updated_at":"2025-04-08T09:30:00.123456"}]"#,
        )
        .unwrap();

        let tasks = TaskManager::open(&path, TaskDefaults::default());
        let task = tasks.get_task("t1").unwrap();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, 2);
        assert!(task.updated_at > task.created_at);
    }

    #[test]
    fn updated_before_created_is_invalid_and_repaired_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.json");
        let raw = r#"{"id":"t1","title":"Skewed","priority":1,
            "created_at":"2025-04-08T10:00:00Z","updated_at":"2025-04-08T09:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert!(matches!(task.validate(), Err(Error::Validation(_))));

        std::fs::write(&path, format!("[{raw}]")).unwrap();
        let mut tasks = TaskManager::open(&path, TaskDefaults::default());
        let loaded = tasks.get_task("t1").unwrap();
        assert_eq!(loaded.updated_at, loaded.created_at);

        let updated = tasks
            .update_task("t1", TaskUpdate::status(TaskStatus::Completed))
            .unwrap();
        assert!(updated.updated_at > updated.created_at);
    }
}
