//! Storage layer for tasktracker
//!
//! All state lives in a single data directory (default `~/.tasktracker`):
//!
//! ```text
//! ~/.tasktracker/
//!   tasks.json      # JSON array of tasks
//!   plan.json       # JSON array of plan steps
//!   notes.txt       # free-form notes
//!   config.toml     # optional settings
//! ```
//!
//! Every file is rewritten whole on save via temp file + rename, so a
//! reader never observes a partially written collection.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Name of the data directory under the home directory
pub const DATA_DIR: &str = ".tasktracker";

pub const TASKS_FILE: &str = "tasks.json";
pub const PLAN_FILE: &str = "plan.json";
pub const NOTES_FILE: &str = "notes.txt";
pub const CONFIG_FILE: &str = "config.toml";

/// Locates the tracker's files inside one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `explicit` when given, otherwise `~/.tasktracker`
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit {
            Some(root) => Ok(Self::new(root)),
            None => Ok(Self::new(default_root()?)),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    pub fn plan_file(&self) -> PathBuf {
        self.root.join(PLAN_FILE)
    }

    pub fn notes_file(&self) -> PathBuf {
        self.root.join(NOTES_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Create the data directory if it does not exist yet
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|err| Error::persistence(&self.root, err))
    }
}

/// Default data directory: `$HOME/.tasktracker`
pub fn default_root() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DATA_DIR))
        .ok_or_else(|| Error::OperationFailed("could not determine home directory".to_string()))
}

// =============================================================================
// File I/O helpers
// =============================================================================

/// Write JSON data atomically (pretty-printed)
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, json.as_bytes())
}

/// Write data atomically using temp file + rename
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| Error::persistence(parent, err))?;
        }
    }

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let written = write_temp(&temp_path, data).and_then(|()| fs::rename(&temp_path, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::persistence(path, err));
    }

    tracing::debug!(path = %path.display(), bytes = data.len(), "wrote file");
    Ok(())
}

fn write_temp(temp_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}
