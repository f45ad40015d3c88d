//! Tool definitions and dispatch.
//!
//! Every tool returns `{"success": true, "result": ...}` or
//! `{"success": false, "error": {"code": ..., "message": ...}}`.

use std::path::Path;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::api::TrackerApi;
use crate::error::{Error, Result};
use crate::plan::{NewPlanStep, PlanStepUpdate};
use crate::task::{self, NewTask, TaskFilter, TaskStatus, TaskUpdate};

const TOOL_NAMES: &[&str] = &[
    "list_tasks",
    "get_task",
    "add_task",
    "update_task",
    "delete_task",
    "list_plan_steps",
    "get_plan_step",
    "add_plan_step",
    "update_plan_step",
    "toggle_plan_step",
    "reorder_plan_step",
    "delete_plan_step",
    "get_notes",
    "save_notes",
    "export_data",
    "import_data",
];

pub fn definitions() -> Vec<Value> {
    let status = json!({
        "type": "string",
        "enum": ["not_started", "in_progress", "completed"]
    });
    let priority = json!({
        "type": "integer",
        "minimum": task::MIN_PRIORITY,
        "maximum": task::MAX_PRIORITY,
        "description": "1 = high, 2 = medium, 3 = low"
    });
    let task_id = json!({ "type": "string", "description": "Task ID" });
    let step_id = json!({ "type": "string", "description": "Plan step ID" });

    vec![
        json!({
            "name": "list_tasks",
            "description": "List tasks in creation order, optionally filtered by status and priority.",
            "inputSchema": {
                "type": "object",
                "properties": { "status": status, "priority": priority },
                "additionalProperties": false
            }
        }),
        json!({
            "name": "get_task",
            "description": "Get one task by ID.",
            "inputSchema": {
                "type": "object",
                "properties": { "task_id": task_id },
                "required": ["task_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "add_task",
            "description": "Add a new task.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": priority,
                    "status": status
                },
                "required": ["title"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "update_task",
            "description": "Update the given fields of a task; omitted fields are unchanged.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "task_id": task_id,
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": priority,
                    "status": status
                },
                "required": ["task_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "delete_task",
            "description": "Delete a task and return it.",
            "inputSchema": {
                "type": "object",
                "properties": { "task_id": task_id },
                "required": ["task_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "list_plan_steps",
            "description": "List plan steps sorted by order.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        }),
        json!({
            "name": "get_plan_step",
            "description": "Get one plan step by ID.",
            "inputSchema": {
                "type": "object",
                "properties": { "step_id": step_id },
                "required": ["step_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "add_plan_step",
            "description": "Add a plan step at the end, or at `order` when given.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "details": { "type": "string" },
                    "order": { "type": "integer", "description": "Zero-based position" }
                },
                "required": ["name"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "update_plan_step",
            "description": "Update the given fields of a plan step; `order` moves it.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "step_id": step_id,
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "details": { "type": "string" },
                    "completed": { "type": "boolean" },
                    "order": { "type": "integer" }
                },
                "required": ["step_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "toggle_plan_step",
            "description": "Flip the completed flag of a plan step.",
            "inputSchema": {
                "type": "object",
                "properties": { "step_id": step_id },
                "required": ["step_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "reorder_plan_step",
            "description": "Move a plan step to a new zero-based position (clamped to range).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "step_id": step_id,
                    "order": { "type": "integer" }
                },
                "required": ["step_id", "order"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "delete_plan_step",
            "description": "Delete a plan step; later steps move up.",
            "inputSchema": {
                "type": "object",
                "properties": { "step_id": step_id },
                "required": ["step_id"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "get_notes",
            "description": "Get the notes text.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        }),
        json!({
            "name": "save_notes",
            "description": "Replace the notes text.",
            "inputSchema": {
                "type": "object",
                "properties": { "notes_text": { "type": "string" } },
                "required": ["notes_text"],
                "additionalProperties": false
            }
        }),
        json!({
            "name": "export_data",
            "description": "Export tasks, plan and notes. Writes to `file_path` when given, otherwise returns the data.",
            "inputSchema": {
                "type": "object",
                "properties": { "file_path": { "type": "string" } },
                "additionalProperties": false
            }
        }),
        json!({
            "name": "import_data",
            "description": "Replace all tasks, plan and notes from `file_path` or an inline `data` object.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file_path": { "type": "string" },
                    "data": { "type": "object" }
                },
                "additionalProperties": false
            }
        }),
    ]
}

/// Run a tool and wrap the outcome in the success/error envelope
pub fn call(api: &mut TrackerApi, name: &str, args: Value) -> Value {
    if !TOOL_NAMES.contains(&name) {
        return json!({
            "success": false,
            "error": { "code": "UNKNOWN_TOOL", "message": format!("unknown tool '{name}'") }
        });
    }
    match dispatch(api, name, args) {
        Ok(result) => json!({ "success": true, "result": result }),
        Err(err) => json!({
            "success": false,
            "error": { "code": err.code(), "message": err.to_string() }
        }),
    }
}

fn dispatch(api: &mut TrackerApi, name: &str, args: Value) -> Result<Value> {
    let args = Args::new(args)?;
    match name {
        "list_tasks" => {
            let filter = TaskFilter {
                status: args.status("status")?,
                priority: args.priority("priority")?,
            };
            to_value(api.list_tasks(&filter))
        }
        "get_task" => to_value(api.get_task(&args.required_str("task_id")?)?),
        "add_task" => {
            let input = NewTask {
                title: args.required_str("title")?,
                description: args.optional_str("description")?.unwrap_or_default(),
                priority: args.priority("priority")?,
                status: args.status("status")?,
            };
            to_value(api.add_task(input)?)
        }
        "update_task" => {
            let id = args.required_str("task_id")?;
            let update = TaskUpdate {
                title: args.optional_str("title")?,
                description: args.optional_str("description")?,
                priority: args.priority("priority")?,
                status: args.status("status")?,
            };
            to_value(api.update_task(&id, update)?)
        }
        "delete_task" => to_value(api.delete_task(&args.required_str("task_id")?)?),
        "list_plan_steps" => to_value(api.list_plan_steps()),
        "get_plan_step" => to_value(api.get_plan_step(&args.required_str("step_id")?)?),
        "add_plan_step" => {
            let input = NewPlanStep {
                name: args.required_str("name")?,
                description: args.optional_str("description")?.unwrap_or_default(),
                details: args.optional_str("details")?.unwrap_or_default(),
            };
            let step = match args.optional_i64("order")? {
                Some(order) => api.insert_plan_step(input, order)?,
                None => api.add_plan_step(input)?,
            };
            to_value(step)
        }
        "update_plan_step" => {
            let id = args.required_str("step_id")?;
            let update = PlanStepUpdate {
                name: args.optional_str("name")?,
                description: args.optional_str("description")?,
                details: args.optional_str("details")?,
                completed: args.optional_bool("completed")?,
            };
            let order = args.optional_i64("order")?;
            let mut step = if update.is_empty() {
                api.get_plan_step(&id)?
            } else {
                api.update_plan_step(&id, update)?
            };
            if let Some(order) = order {
                step = api.reorder_plan_step(&id, order)?;
            }
            to_value(step)
        }
        "toggle_plan_step" => to_value(api.toggle_plan_step(&args.required_str("step_id")?)?),
        "reorder_plan_step" => {
            let id = args.required_str("step_id")?;
            let order = args
                .optional_i64("order")?
                .ok_or_else(|| missing("order"))?;
            to_value(api.reorder_plan_step(&id, order)?)
        }
        "delete_plan_step" => to_value(api.delete_plan_step(&args.required_str("step_id")?)?),
        "get_notes" => Ok(json!({ "notes": api.get_notes() })),
        "save_notes" => {
            api.save_notes(args.required_str("notes_text")?)?;
            Ok(json!({ "notes": api.get_notes() }))
        }
        "export_data" => match args.optional_str("file_path")? {
            Some(path) => {
                let dataset = api.export_to_file(Path::new(&path))?;
                Ok(json!({
                    "file_path": path,
                    "tasks": dataset.tasks.len(),
                    "plan_steps": dataset.plan.len()
                }))
            }
            None => to_value(api.export_data()),
        },
        "import_data" => {
            let dataset = match (args.optional_str("file_path")?, args.get("data")) {
                (Some(path), None) => api.import_from_file(Path::new(&path))?,
                (None, Some(data)) => api.import_data(data.clone())?,
                _ => {
                    return Err(Error::Validation(
                        "pass exactly one of 'file_path' or 'data'".to_string(),
                    ));
                }
            };
            Ok(json!({
                "tasks": dataset.tasks.len(),
                "plan_steps": dataset.plan.len(),
                "notes_chars": dataset.notes.chars().count()
            }))
        }
        _ => Err(Error::Validation(format!("unknown tool '{name}'"))),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn missing(key: &str) -> Error {
    Error::Validation(format!("missing required argument '{key}'"))
}

/// Typed access to a tool's argument object
struct Args {
    map: Map<String, Value>,
}

impl Args {
    fn new(args: Value) -> Result<Self> {
        match args {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(Error::Validation("arguments must be an object".to_string())),
        }
    }

    /// Present and not null
    fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?.ok_or_else(|| missing(key))
    }

    fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(Error::Validation(format!("'{key}' must be a string"))),
        }
    }

    fn optional_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::Validation(format!("'{key}' must be an integer"))),
        }
    }

    fn optional_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| Error::Validation(format!("'{key}' must be a boolean"))),
        }
    }

    fn status(&self, key: &str) -> Result<Option<TaskStatus>> {
        self.optional_str(key)?
            .map(|value| value.parse())
            .transpose()
    }

    /// Priority as an integer, or as text ("2", "high")
    fn priority(&self, key: &str) -> Result<Option<u8>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => task::parse_priority(value).map(Some),
            Some(value) => {
                let raw = value
                    .as_i64()
                    .ok_or_else(|| Error::Validation(format!("'{key}' must be an integer")))?;
                let priority = u8::try_from(raw).map_err(|_| {
                    Error::Validation(format!(
                        "priority must be between {} and {} (got {raw})",
                        task::MIN_PRIORITY,
                        task::MAX_PRIORITY
                    ))
                })?;
                task::validate_priority(priority).map(Some)
            }
        }
    }
}
