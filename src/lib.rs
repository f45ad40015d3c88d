//! tasktracker - personal task, project plan and notes tracker
//!
//! Tasks, an ordered project plan and a block of free-form notes are kept
//! as plain files in one data directory and shared by three front ends: a
//! command-line interface, a terminal UI and an MCP server for language
//! model clients.
//!
//! # Module Organization
//!
//! - `api`: The tracker API every front end goes through, plus export/import
//! - `task`: Task records and the task manager
//! - `plan`: Plan steps and the plan manager (dense ordering)
//! - `notes`: The notes store
//! - `store`: Generic transactional record store backed by a JSON file
//! - `record`: Shared record traits, ids and timestamps
//! - `storage`: Data directory layout and atomic file writes
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `output`: Human and JSON output for the CLI
//! - `cli`: Command-line interface using clap
//! - `ui`: Terminal UI using ratatui
//! - `mcp`: MCP server over stdio

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod notes;
pub mod output;
pub mod plan;
pub mod record;
pub mod storage;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
