//! Command-line interface for tasktracker
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::TrackerApi;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::Storage;

mod data;
mod notes;
mod plan;
mod task;

/// tasktracker - personal tasks, project plan and notes
///
/// Without a subcommand the terminal UI starts.
#[derive(Parser, Debug)]
#[command(name = "tasktracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to ~/.tasktracker)
    #[arg(long, global = true, env = "TASKTRACKER_HOME")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Project plan management
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Show or replace notes
    #[command(subcommand)]
    Notes(NotesCommands),

    /// Export tasks, plan and notes to a JSON file
    Export {
        /// Destination file
        file: PathBuf,
    },

    /// Replace all data with the contents of a JSON export
    Import {
        /// Source file
        file: PathBuf,
    },

    /// Open the terminal UI
    Tui,

    /// Serve the tracker over MCP (JSON-RPC on stdio)
    Mcp,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks
    List {
        /// Only tasks with this status (not_started, in_progress, completed)
        #[arg(short, long)]
        status: Option<String>,

        /// Only tasks with this priority (1-3 or high/medium/low)
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Show one task
    Show {
        /// Task ID
        id: String,
    },

    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority (1-3 or high/medium/low)
        #[arg(short, long)]
        priority: Option<String>,

        /// Initial status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Update fields of a task
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// List plan steps in order
    List,

    /// Show one step
    Show {
        /// Step ID
        id: String,
    },

    /// Add a step (appended unless --order is given)
    Add {
        /// Step name
        name: String,

        /// Short description
        #[arg(short, long)]
        description: Option<String>,

        /// Detailed notes for the step
        #[arg(short = 'D', long)]
        details: Option<String>,

        /// Position to insert at (0 = first)
        #[arg(short, long, allow_negative_numbers = true)]
        order: Option<i64>,
    },

    /// Update fields of a step
    Update {
        /// Step ID
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New details
        #[arg(short = 'D', long)]
        details: Option<String>,

        /// Mark completed (true) or not completed (false)
        #[arg(long)]
        completed: Option<bool>,

        /// Move the step to this position
        #[arg(short, long, allow_negative_numbers = true)]
        order: Option<i64>,
    },

    /// Flip the completion flag of a step
    Toggle {
        /// Step ID
        id: String,
    },

    /// Move a step to a new position
    Move {
        /// Step ID
        id: String,

        /// New position (clamped to the plan length)
        #[arg(allow_negative_numbers = true)]
        order: i64,
    },

    /// Delete a step
    Delete {
        /// Step ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotesCommands {
    /// Print the notes
    Show,

    /// Replace the notes (use - to read from stdin)
    Set {
        /// New notes text
        text: String,
    },
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Open the tracker for the selected data directory
    pub fn open_api(&self) -> Result<TrackerApi> {
        let storage = Storage::resolve(self.data_dir.clone())?;
        let config = Config::load_from_dir(storage.root());
        TrackerApi::open(storage, config)
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = GlobalArgs {
            data_dir: self.data_dir,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            None | Some(Commands::Tui) => {
                let api = global.open_api()?;
                crate::ui::run(api)
            }
            Some(Commands::Mcp) => {
                let api = global.open_api()?;
                crate::mcp::serve_stdio(api)
            }
            Some(Commands::Task(cmd)) => match cmd {
                TaskCommands::List { status, priority } => task::run_list(task::ListOptions {
                    status,
                    priority,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Add {
                    title,
                    description,
                    priority,
                    status,
                } => task::run_add(task::AddOptions {
                    title,
                    description,
                    priority,
                    status,
                    global,
                }),
                TaskCommands::Update {
                    id,
                    title,
                    description,
                    priority,
                    status,
                } => task::run_update(task::UpdateOptions {
                    id,
                    title,
                    description,
                    priority,
                    status,
                    global,
                }),
                TaskCommands::Delete { id } => task::run_delete(task::DeleteOptions { id, global }),
            },
            Some(Commands::Plan(cmd)) => match cmd {
                PlanCommands::List => plan::run_list(plan::ListOptions { global }),
                PlanCommands::Show { id } => plan::run_show(plan::ShowOptions { id, global }),
                PlanCommands::Add {
                    name,
                    description,
                    details,
                    order,
                } => plan::run_add(plan::AddOptions {
                    name,
                    description,
                    details,
                    order,
                    global,
                }),
                PlanCommands::Update {
                    id,
                    name,
                    description,
                    details,
                    completed,
                    order,
                } => plan::run_update(plan::UpdateOptions {
                    id,
                    name,
                    description,
                    details,
                    completed,
                    order,
                    global,
                }),
                PlanCommands::Toggle { id } => plan::run_toggle(plan::ToggleOptions { id, global }),
                PlanCommands::Move { id, order } => {
                    plan::run_move(plan::MoveOptions { id, order, global })
                }
                PlanCommands::Delete { id } => plan::run_delete(plan::DeleteOptions { id, global }),
            },
            Some(Commands::Notes(cmd)) => match cmd {
                NotesCommands::Show => notes::run_show(notes::ShowOptions { global }),
                NotesCommands::Set { text } => notes::run_set(notes::SetOptions { text, global }),
            },
            Some(Commands::Export { file }) => data::run_export(data::ExportOptions { file, global }),
            Some(Commands::Import { file }) => data::run_import(data::ImportOptions { file, global }),
        }
    }
}
