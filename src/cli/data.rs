//! `tasktracker export` / `tasktracker import`.

use std::path::PathBuf;

use serde::Serialize;

use crate::api::Dataset;
use crate::cli::GlobalArgs;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub struct ExportOptions {
    pub file: PathBuf,
    pub global: GlobalArgs,
}

pub struct ImportOptions {
    pub file: PathBuf,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct TransferOutput {
    file: String,
    tasks: usize,
    plan_steps: usize,
    notes_chars: usize,
}

impl TransferOutput {
    fn new(file: &std::path::Path, dataset: &Dataset) -> Self {
        Self {
            file: file.display().to_string(),
            tasks: dataset.tasks.len(),
            plan_steps: dataset.plan.len(),
            notes_chars: dataset.notes.chars().count(),
        }
    }
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let api = options.global.open_api()?;
    let dataset = api.export_to_file(&options.file)?;
    let output = TransferOutput::new(&options.file, &dataset);

    let mut human = HumanOutput::new("Data exported");
    push_counts(&mut human, &output);

    emit_success(options.global.output(), "export", &output, Some(&human))
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let mut api = options.global.open_api()?;
    let dataset = api.import_from_file(&options.file)?;
    let output = TransferOutput::new(&options.file, &dataset);

    let mut human = HumanOutput::new("Data imported");
    push_counts(&mut human, &output);
    human.push_warning("previous tasks, plan and notes were replaced");

    emit_success(options.global.output(), "import", &output, Some(&human))
}

fn push_counts(human: &mut HumanOutput, output: &TransferOutput) {
    human.push_summary("File", output.file.clone());
    human.push_summary("Tasks", output.tasks.to_string());
    human.push_summary("Plan steps", output.plan_steps.to_string());
    human.push_summary("Notes", format!("{} chars", output.notes_chars));
}
