//! `tasktracker plan` command implementations.

use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::plan::{NewPlanStep, PlanStep, PlanStepUpdate};

pub struct ListOptions {
    pub global: GlobalArgs,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalArgs,
}

pub struct AddOptions {
    pub name: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub order: Option<i64>,
    pub global: GlobalArgs,
}

pub struct UpdateOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<i64>,
    pub global: GlobalArgs,
}

pub struct ToggleOptions {
    pub id: String,
    pub global: GlobalArgs,
}

pub struct MoveOptions {
    pub id: String,
    pub order: i64,
    pub global: GlobalArgs,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct PlanListOutput {
    total: usize,
    completed: usize,
    steps: Vec<PlanStep>,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let api = options.global.open_api()?;
    let steps = api.list_plan_steps();
    let completed = steps.iter().filter(|step| step.completed).count();

    let mut human = HumanOutput::new("Plan");
    human.push_summary("Steps", steps.len().to_string());
    human.push_summary("Completed", completed.to_string());
    for step in &steps {
        human.push_detail(step_line(step));
    }
    if steps.is_empty() {
        human.push_next_step("tasktracker plan add \"<name>\"");
    }

    let output = PlanListOutput {
        total: steps.len(),
        completed,
        steps,
    };
    emit_success(options.global.output(), "plan list", &output, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let api = options.global.open_api()?;
    let step = api.get_plan_step(&options.id)?;

    let mut human = HumanOutput::new(format!("Plan step {}", step.id));
    push_step_summary(&mut human, &step);
    if !step.description.is_empty() {
        human.push_summary("Description", step.description.clone());
    }
    human.push_summary("Created", step.created_at.to_rfc3339());
    human.push_summary("Updated", step.updated_at.to_rfc3339());
    for line in step.details.lines() {
        human.push_detail(line);
    }

    emit_success(options.global.output(), "plan show", &step, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let input = NewPlanStep {
        name: options.name,
        description: options.description.unwrap_or_default(),
        details: options.details.unwrap_or_default(),
    };
    let mut api = options.global.open_api()?;
    let step = match options.order {
        Some(order) => api.insert_plan_step(input, order)?,
        None => api.add_plan_step(input)?,
    };

    let mut human = HumanOutput::new("Plan step added");
    push_step_summary(&mut human, &step);
    human.push_next_step(format!("tasktracker plan show {}", step.id));

    emit_success(options.global.output(), "plan add", &step, Some(&human))
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let update = PlanStepUpdate {
        name: options.name,
        description: options.description,
        details: options.details,
        completed: options.completed,
    };
    if update.is_empty() && options.order.is_none() {
        return Err(Error::Validation(
            "nothing to update (pass --name, --description, --details, --completed or --order)"
                .to_string(),
        ));
    }

    let mut api = options.global.open_api()?;
    let mut step = if update.is_empty() {
        api.get_plan_step(&options.id)?
    } else {
        api.update_plan_step(&options.id, update)?
    };
    if let Some(order) = options.order {
        step = api.reorder_plan_step(&step.id, order)?;
    }

    let mut human = HumanOutput::new("Plan step updated");
    push_step_summary(&mut human, &step);

    emit_success(options.global.output(), "plan update", &step, Some(&human))
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let mut api = options.global.open_api()?;
    let step = api.toggle_plan_step(&options.id)?;

    let header = if step.completed {
        "Plan step completed"
    } else {
        "Plan step reopened"
    };
    let mut human = HumanOutput::new(header);
    push_step_summary(&mut human, &step);

    emit_success(options.global.output(), "plan toggle", &step, Some(&human))
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let mut api = options.global.open_api()?;
    let step = api.reorder_plan_step(&options.id, options.order)?;

    let mut human = HumanOutput::new("Plan step moved");
    push_step_summary(&mut human, &step);
    if i64::try_from(step.order).map_or(true, |order| order != options.order) {
        human.push_warning(format!(
            "requested position {} was clamped to {}",
            options.order, step.order
        ));
    }

    emit_success(options.global.output(), "plan move", &step, Some(&human))
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut api = options.global.open_api()?;
    let step = api.delete_plan_step(&options.id)?;

    let mut human = HumanOutput::new("Plan step deleted");
    human.push_summary("ID", step.id.clone());
    human.push_summary("Name", step.name.clone());

    emit_success(options.global.output(), "plan delete", &step, Some(&human))
}

fn push_step_summary(human: &mut HumanOutput, step: &PlanStep) {
    human.push_summary("ID", step.id.clone());
    human.push_summary("Name", step.name.clone());
    human.push_summary("Order", step.order.to_string());
    human.push_summary("Completed", if step.completed { "yes" } else { "no" });
}

fn step_line(step: &PlanStep) -> String {
    let mark = if step.completed { "x" } else { " " };
    format!("{}. [{mark}] {} {}", step.order, step.id, step.name)
}
