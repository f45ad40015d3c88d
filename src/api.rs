//! The tracker API shared by every front end.
//!
//! [`TrackerApi`] owns the task manager, the plan manager and the notes
//! store for one data directory. Front ends construct exactly one per
//! process and route every read and write through it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::notes::NotesStore;
use crate::plan::{NewPlanStep, PlanManager, PlanStep, PlanStepUpdate};
use crate::record::Record;
use crate::storage::{self, Storage};
use crate::task::{NewTask, Task, TaskFilter, TaskManager, TaskUpdate};

/// Everything the tracker stores, as exchanged by export and import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub tasks: Vec<Task>,
    pub plan: Vec<PlanStep>,
    pub notes: String,
}

pub struct TrackerApi {
    storage: Storage,
    config: Config,
    tasks: TaskManager,
    plan: PlanManager,
    notes: NotesStore,
}

impl TrackerApi {
    pub fn open(storage: Storage, config: Config) -> Result<Self> {
        let defaults = config.tasks.defaults()?;
        let tasks = TaskManager::open(storage.tasks_file(), defaults);
        let plan = PlanManager::open(storage.plan_file());
        let notes = NotesStore::open(storage.notes_file());
        tracing::debug!(
            root = %storage.root().display(),
            tasks = tasks.len(),
            steps = plan.len(),
            "tracker opened"
        );
        Ok(Self {
            storage,
            config,
            tasks,
            plan,
            notes,
        })
    }

    /// Open the data directory at `root`, reading its `config.toml` if any
    pub fn open_at(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Storage::new(root);
        let config = Config::load_from_dir(storage.root());
        Self::open(storage, config)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn add_task(&mut self, input: NewTask) -> Result<Task> {
        self.tasks.add_task(input)
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.tasks.get_task(id)
    }

    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        self.tasks.update_task(id, update)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        self.tasks.delete_task(id)
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks.list_tasks(filter)
    }

    // =========================================================================
    // Plan
    // =========================================================================

    pub fn plan_steps(&self) -> &[PlanStep] {
        self.plan.steps()
    }

    pub fn add_plan_step(&mut self, input: NewPlanStep) -> Result<PlanStep> {
        self.plan.add_plan_step(input)
    }

    pub fn insert_plan_step(&mut self, input: NewPlanStep, position: i64) -> Result<PlanStep> {
        self.plan.insert_plan_step(input, position)
    }

    pub fn get_plan_step(&self, id: &str) -> Result<PlanStep> {
        self.plan.get_plan_step(id)
    }

    pub fn update_plan_step(&mut self, id: &str, update: PlanStepUpdate) -> Result<PlanStep> {
        self.plan.update_plan_step(id, update)
    }

    pub fn reorder_plan_step(&mut self, id: &str, new_order: i64) -> Result<PlanStep> {
        self.plan.reorder_plan_step(id, new_order)
    }

    pub fn toggle_plan_step(&mut self, id: &str) -> Result<PlanStep> {
        self.plan.toggle_plan_step(id)
    }

    pub fn delete_plan_step(&mut self, id: &str) -> Result<PlanStep> {
        self.plan.delete_plan_step(id)
    }

    pub fn list_plan_steps(&self) -> Vec<PlanStep> {
        self.plan.list_plan_steps()
    }

    // =========================================================================
    // Notes
    // =========================================================================

    pub fn get_notes(&self) -> &str {
        self.notes.get()
    }

    pub fn save_notes(&mut self, text: impl Into<String>) -> Result<()> {
        self.notes.save(text)
    }

    // =========================================================================
    // Whole-dataset operations
    // =========================================================================

    pub fn export_data(&self) -> Dataset {
        Dataset {
            tasks: self.tasks.tasks().to_vec(),
            plan: self.plan.list_plan_steps(),
            notes: self.notes.get().to_string(),
        }
    }

    /// Write the dataset to `path` as pretty JSON
    pub fn export_to_file(&self, path: &Path) -> Result<Dataset> {
        let dataset = self.export_data();
        storage::write_json(path, &dataset)?;
        tracing::info!(
            path = %path.display(),
            tasks = dataset.tasks.len(),
            steps = dataset.plan.len(),
            "exported data"
        );
        Ok(dataset)
    }

    /// Replace all tracker state with `document`.
    ///
    /// The document is fully validated before anything changes: it must be
    /// an object with `tasks` and `plan` arrays and a `notes` string, every
    /// record must be well formed, and ids must be unique per collection.
    pub fn import_data(&mut self, document: Value) -> Result<Dataset> {
        let dataset = parse_dataset(document)?;
        let previous = self.export_data();

        if let Err(err) = self.apply_dataset(dataset) {
            tracing::warn!(error = %err, "import failed, restoring previous data");
            if let Err(restore_err) = self.apply_dataset(previous) {
                tracing::warn!(error = %restore_err, "could not restore previous data");
            }
            return Err(err);
        }

        let imported = self.export_data();
        tracing::info!(
            tasks = imported.tasks.len(),
            steps = imported.plan.len(),
            "imported data"
        );
        Ok(imported)
    }

    pub fn import_from_file(&mut self, path: &Path) -> Result<Dataset> {
        let content = fs::read_to_string(path).map_err(|err| Error::persistence(path, err))?;
        let document: Value = serde_json::from_str(&content).map_err(|err| {
            Error::Validation(format!("{} is not valid JSON: {err}", path.display()))
        })?;
        self.import_data(document)
    }

    /// Persist all three stores
    pub fn save_all(&self) -> Result<()> {
        self.tasks.save()?;
        self.plan.save()?;
        self.notes.flush()?;
        Ok(())
    }

    /// Re-read all three stores from disk, picking up edits made elsewhere
    pub fn reload_all(&mut self) {
        self.tasks.reload();
        self.plan.reload();
        self.notes.reload();
        tracing::debug!(
            tasks = self.tasks.len(),
            steps = self.plan.len(),
            "reloaded data"
        );
    }

    fn apply_dataset(&mut self, dataset: Dataset) -> Result<()> {
        self.tasks.replace_all(dataset.tasks)?;
        self.plan.replace_all(dataset.plan)?;
        self.notes.save(dataset.notes)?;
        Ok(())
    }
}

/// Validate an import document and convert it into a [`Dataset`]
pub fn parse_dataset(document: Value) -> Result<Dataset> {
    let Value::Object(mut map) = document else {
        return Err(Error::Validation(
            "import document must be a JSON object".to_string(),
        ));
    };

    let tasks = take_list(&mut map, "tasks")?;
    let plan = take_list(&mut map, "plan")?;
    let notes = match map.remove("notes") {
        Some(Value::String(notes)) => notes,
        Some(_) => {
            return Err(Error::Validation("'notes' must be a string".to_string()));
        }
        None => {
            return Err(Error::Validation(
                "import document is missing 'notes'".to_string(),
            ));
        }
    };

    Ok(Dataset {
        tasks: parse_records(tasks, "tasks")?,
        plan: parse_records(plan, "plan")?,
        notes,
    })
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match map.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(Error::Validation(format!("'{key}' must be a list"))),
        None => Err(Error::Validation(format!(
            "import document is missing '{key}'"
        ))),
    }
}

fn parse_records<T: Record>(items: Vec<Value>, key: &str) -> Result<Vec<T>> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record: T = serde_json::from_value(item)
            .map_err(|err| Error::Validation(format!("{key}[{index}]: {err}")))?;
        record.validate().map_err(|err| match err {
            Error::Validation(message) => Error::Validation(format!("{key}[{index}]: {message}")),
            other => other,
        })?;
        if !seen.insert(record.id().to_string()) {
            return Err(Error::Validation(format!(
                "{key}[{index}]: duplicate id '{}'",
                record.id()
            )));
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn api(temp: &TempDir) -> TrackerApi {
        TrackerApi::open_at(temp.path()).unwrap()
    }

    fn populated(temp: &TempDir) -> TrackerApi {
        let mut api = api(temp);
        api.add_task(NewTask::titled("Write tests")).unwrap();
        let mut input = NewTask::titled("Release");
        input.priority = Some(3);
        input.status = Some(TaskStatus::InProgress);
        api.add_task(input).unwrap();
        api.add_plan_step(NewPlanStep::named("Design")).unwrap();
        api.add_plan_step(NewPlanStep::named("Build")).unwrap();
        api.save_notes("remember the changelog").unwrap();
        api
    }

    #[test]
    fn export_then_import_round_trips() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let api_a = populated(&source);
        let exported = api_a.export_data();

        let mut api_b = api(&target);
        api_b.add_task(NewTask::titled("will be replaced")).unwrap();
        let imported = api_b
            .import_data(serde_json::to_value(&exported).unwrap())
            .unwrap();

        assert_eq!(imported, exported);
        assert_eq!(api_b.export_data(), exported);

        let reopened = api(&target);
        assert_eq!(reopened.export_data(), exported);
    }

    #[test]
    fn invalid_documents_leave_state_untouched() {
        let temp = TempDir::new().unwrap();
        let mut api = populated(&temp);
        let before = api.export_data();
        let task = serde_json::to_value(&before.tasks[0]).unwrap();

        let bad_documents = vec![
            json!([1, 2, 3]),
            json!({"tasks": [], "plan": []}),
            json!({"tasks": {}, "plan": [], "notes": ""}),
            json!({"tasks": [], "plan": [], "notes": 5}),
            json!({"tasks": [{"id": "x"}], "plan": [], "notes": ""}),
            json!({"tasks": [task.clone(), task], "plan": [], "notes": ""}),
            json!({"tasks": [{"id": "x", "title": "t", "priority": 8}], "plan": [], "notes": ""}),
            json!({"tasks": [], "plan": [{"id": "s", "name": "  "}], "notes": ""}),
            json!({"tasks": [{
                "id": "x", "title": "t",
                "created_at": "2025-04-08T10:00:00Z", "updated_at": "2025-04-08T09:00:00Z"
            }], "plan": [], "notes": ""}),
            json!({"tasks": [], "plan": [{
                "id": "s", "name": "S",
                "created_at": "2025-04-08T10:00:00Z", "updated_at": "2025-04-08T09:00:00Z"
            }], "notes": ""}),
        ];

        for document in bad_documents {
            let err = api.import_data(document.clone()).unwrap_err();
            assert!(
                matches!(err, Error::Validation(_)),
                "expected validation error for {document}"
            );
            assert_eq!(api.export_data(), before);
        }
    }

    #[test]
    fn import_densifies_plan_orders() {
        let temp = TempDir::new().unwrap();
        let mut api = api(&temp);

        let imported = api
            .import_data(json!({
                "tasks": [],
                "plan": [
                    {"id": "b", "name": "B", "order": 4},
                    {"id": "a", "name": "A", "order": 4},
                    {"id": "c", "name": "C", "order": 0}
                ],
                "notes": ""
            }))
            .unwrap();

        let ids: Vec<&str> = imported.plan.iter().map(|step| step.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        let orders: Vec<usize> = imported.plan.iter().map(|step| step.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn file_export_and_import() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let api_a = populated(&source);
        let file = source.path().join("backup").join("export.json");

        let exported = api_a.export_to_file(&file).unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert!(raw.get("tasks").is_some());
        assert!(raw.get("plan").is_some());
        assert_eq!(raw["notes"], "remember the changelog");

        let mut api_b = api(&target);
        assert_eq!(api_b.import_from_file(&file).unwrap(), exported);
    }

    #[test]
    fn import_from_missing_or_garbled_file_fails() {
        let temp = TempDir::new().unwrap();
        let mut api = api(&temp);

        let missing = api.import_from_file(&temp.path().join("nope.json"));
        assert!(matches!(missing, Err(Error::Persistence { .. })));

        let garbled = temp.path().join("garbled.json");
        fs::write(&garbled, "{{{").unwrap();
        assert!(matches!(
            api.import_from_file(&garbled),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn reload_all_picks_up_external_changes() {
        let temp = TempDir::new().unwrap();
        let mut first = populated(&temp);
        let mut second = api(&temp);

        second.add_task(NewTask::titled("From elsewhere")).unwrap();
        second.save_notes("edited elsewhere").unwrap();

        assert_eq!(first.tasks().len(), 2);
        first.reload_all();
        assert_eq!(first.tasks().len(), 3);
        assert_eq!(first.get_notes(), "edited elsewhere");
    }

    #[test]
    fn save_all_writes_every_file() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);
        api.save_all().unwrap();

        assert!(api.storage().tasks_file().exists());
        assert!(api.storage().plan_file().exists());
        assert!(api.storage().notes_file().exists());
    }

    #[test]
    fn configured_defaults_apply_to_new_tasks() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("config.toml"),
            "[tasks]\ndefault_priority = 2\ndefault_status = \"in_progress\"\n",
        )
        .unwrap();
        let mut api = api(&temp);

        let task = api.add_task(NewTask::titled("Configured")).unwrap();
        assert_eq!(task.priority, 2);
        assert_eq!(task.status, TaskStatus::InProgress);
    }
}
