//! Canned prompts offered to MCP clients.

use serde_json::{json, Value};

use crate::error::{Error, Result};

pub fn list() -> Value {
    json!({
        "prompts": [
            {
                "name": "add_task_prompt",
                "description": "Ask the assistant to add a task, filling in what is missing",
                "arguments": [
                    { "name": "title", "description": "Task title", "required": false },
                    { "name": "description", "description": "Task description", "required": false }
                ]
            },
            {
                "name": "create_plan_prompt",
                "description": "Ask the assistant to help break a project into plan steps",
                "arguments": []
            }
        ]
    })
}

pub fn get(name: &str, args: &Value) -> Result<Value> {
    let (description, text) = match name {
        "add_task_prompt" => {
            let title = arg(args, "title");
            let description = arg(args, "description");
            (
                "Add a new task",
                format!(
                    "Please add a new task with the following details:\n\
                     Title: {title}\n\
                     Description: {description}\n\n\
                     Please provide any missing information and set the priority and status.\n"
                ),
            )
        }
        "create_plan_prompt" => (
            "Create a project plan",
            "I need to create a new project plan. Please help me break down this project into clear steps.\n\n\
             For each step, I need:\n\
             1. A clear name\n\
             2. A brief description\n\
             3. Any detailed information needed to complete the step\n\
             4. The logical order of the steps\n\n\
             Please ask me about my project goals so you can help create an appropriate plan.\n"
                .to_string(),
        ),
        _ => return Err(Error::Validation(format!("unknown prompt '{name}'"))),
    };

    Ok(json!({
        "description": description,
        "messages": [
            { "role": "user", "content": { "type": "text", "text": text } }
        ]
    }))
}

fn arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}
