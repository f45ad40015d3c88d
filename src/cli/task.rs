//! `tasktracker task` command implementations.

use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{self, NewTask, Task, TaskFilter, TaskStatus, TaskUpdate};

pub struct ListOptions {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub global: GlobalArgs,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalArgs,
}

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub global: GlobalArgs,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub global: GlobalArgs,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let filter = TaskFilter {
        status: parse_status(options.status.as_deref())?,
        priority: parse_priority(options.priority.as_deref())?,
    };
    let api = options.global.open_api()?;
    let tasks = api.list_tasks(&filter);

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    if let Some(status) = filter.status {
        human.push_summary("Status", status.to_string());
    }
    if let Some(priority) = filter.priority {
        human.push_summary("Priority", format_priority(priority));
    }
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("tasktracker task add \"<title>\"");
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(options.global.output(), "task list", &output, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let api = options.global.open_api()?;
    let task = api.get_task(&options.id)?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task);
    human.push_summary("Created", task.created_at.to_rfc3339());
    human.push_summary("Updated", task.updated_at.to_rfc3339());
    for line in task.description.lines() {
        human.push_detail(line);
    }

    emit_success(options.global.output(), "task show", &task, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let input = NewTask {
        title: options.title,
        description: options.description.unwrap_or_default(),
        priority: parse_priority(options.priority.as_deref())?,
        status: parse_status(options.status.as_deref())?,
    };
    let mut api = options.global.open_api()?;
    let task = api.add_task(input)?;

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("tasktracker task show {}", task.id));

    emit_success(options.global.output(), "task add", &task, Some(&human))
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let update = TaskUpdate {
        title: options.title,
        description: options.description,
        priority: parse_priority(options.priority.as_deref())?,
        status: parse_status(options.status.as_deref())?,
    };
    if update.is_empty() {
        return Err(Error::Validation(
            "nothing to update (pass --title, --description, --priority or --status)".to_string(),
        ));
    }
    let mut api = options.global.open_api()?;
    let task = api.update_task(&options.id, update)?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task);

    emit_success(options.global.output(), "task update", &task, Some(&human))
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut api = options.global.open_api()?;
    let task = api.delete_task(&options.id)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());

    emit_success(options.global.output(), "task delete", &task, Some(&human))
}

fn parse_status(value: Option<&str>) -> Result<Option<TaskStatus>> {
    value.map(str::parse).transpose()
}

fn parse_priority(value: Option<&str>) -> Result<Option<u8>> {
    value.map(task::parse_priority).transpose()
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", format_priority(task.priority));
}

fn format_priority(priority: u8) -> String {
    format!("{priority} ({})", task::priority_label(priority))
}

fn task_line(task: &Task) -> String {
    format!(
        "[{}][P{}] {} {}",
        task.status, task.priority, task.id, task.title
    )
}
