//! Read-only resources: `tasks://`, `plan://` and `notes://`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::TrackerApi;
use crate::error::{Error, Result};
use crate::task::TaskFilter;

const JSON_MIME: &str = "application/json";
const TEXT_MIME: &str = "text/plain";

pub fn list() -> Value {
    json!({
        "resources": [
            {
                "uri": "tasks://all",
                "name": "All tasks",
                "description": "Every task in creation order",
                "mimeType": JSON_MIME
            },
            {
                "uri": "plan://all",
                "name": "Project plan",
                "description": "Every plan step sorted by order",
                "mimeType": JSON_MIME
            },
            {
                "uri": "notes://all",
                "name": "Notes",
                "description": "The free-form notes text",
                "mimeType": TEXT_MIME
            }
        ]
    })
}

pub fn templates() -> Value {
    json!({
        "resourceTemplates": [
            {
                "uriTemplate": "tasks://{task_id}",
                "name": "Task",
                "description": "One task by ID",
                "mimeType": JSON_MIME
            },
            {
                "uriTemplate": "plan://{step_id}",
                "name": "Plan step",
                "description": "One plan step by ID",
                "mimeType": JSON_MIME
            }
        ]
    })
}

pub fn read(api: &TrackerApi, uri: &str) -> Result<Value> {
    let (scheme, target) = uri
        .split_once("://")
        .ok_or_else(|| Error::Validation(format!("invalid resource uri '{uri}'")))?;
    if target.is_empty() {
        return Err(Error::Validation(format!("resource uri '{uri}' names nothing")));
    }

    match (scheme, target) {
        ("tasks", "all") => json_contents(uri, &api.list_tasks(&TaskFilter::default())),
        ("tasks", id) => json_contents(uri, &api.get_task(id)?),
        ("plan", "all") => json_contents(uri, &api.list_plan_steps()),
        ("plan", id) => json_contents(uri, &api.get_plan_step(id)?),
        ("notes", "all") => Ok(contents(uri, TEXT_MIME, api.get_notes().to_string())),
        _ => Err(Error::Validation(format!("unknown resource '{uri}'"))),
    }
}

fn json_contents<T: Serialize + ?Sized>(uri: &str, value: &T) -> Result<Value> {
    let text = serde_json::to_string_pretty(value)?;
    Ok(contents(uri, JSON_MIME, text))
}

fn contents(uri: &str, mime: &str, text: String) -> Value {
    json!({ "contents": [{ "uri": uri, "mimeType": mime, "text": text }] })
}
