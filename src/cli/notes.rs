//! `tasktracker notes` command implementations.

use std::io::Read;

use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub struct ShowOptions {
    pub global: GlobalArgs,
}

pub struct SetOptions {
    pub text: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct NotesOutput {
    notes: String,
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let api = options.global.open_api()?;
    let output = NotesOutput {
        notes: api.get_notes().to_string(),
    };

    emit_success(options.global.output(), "notes show", &output, None)?;
    // Human output is the raw text so it can be piped elsewhere
    if !options.global.json && !options.global.quiet {
        print!("{}", output.notes);
        if !output.notes.is_empty() && !output.notes.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let text = if options.text == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        options.text
    };

    let mut api = options.global.open_api()?;
    api.save_notes(text)?;

    let output = NotesOutput {
        notes: api.get_notes().to_string(),
    };
    let mut human = HumanOutput::new("Notes saved");
    human.push_summary("Characters", output.notes.chars().count().to_string());
    human.push_summary("Lines", output.notes.lines().count().to_string());

    emit_success(options.global.output(), "notes set", &output, Some(&human))
}
