//! Configuration loading and management
//!
//! Handles parsing of the optional `config.toml` in the data directory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::CONFIG_FILE;
use crate::task::{self, TaskDefaults, TaskStatus};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Defaults for new tasks
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Terminal UI settings
    #[serde(default)]
    pub ui: UiConfig,

    /// MCP server settings
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Task defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Priority for tasks created without one (1 = high, 3 = low)
    #[serde(default = "default_task_priority")]
    pub default_priority: u8,

    /// Status for tasks created without one
    #[serde(default = "default_task_status")]
    pub default_status: String,
}

fn default_task_priority() -> u8 {
    task::DEFAULT_PRIORITY
}

fn default_task_status() -> String {
    TaskStatus::NotStarted.as_str().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: default_task_priority(),
            default_status: default_task_status(),
        }
    }
}

impl TasksConfig {
    /// Resolve into typed task defaults
    pub fn defaults(&self) -> Result<TaskDefaults> {
        let priority = task::validate_priority(self.default_priority).map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_priority must be between {} and {}",
                task::MIN_PRIORITY,
                task::MAX_PRIORITY
            ))
        })?;
        let status = self.default_status.parse::<TaskStatus>().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_status '{}' is not a known status",
                self.default_status
            ))
        })?;
        Ok(TaskDefaults { priority, status })
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show the notes column on startup
    #[serde(default = "default_true")]
    pub notes_visible: bool,

    /// Reload when the data files change on disk
    #[serde(default = "default_true")]
    pub watch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notes_visible: true,
            watch: true,
        }
    }
}

/// MCP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Re-read the data files before every request
    #[serde(default = "default_true")]
    pub reload_before_call: bool,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            reload_before_call: true,
        }
    }
}

impl Config {
    /// Load configuration from a `config.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a data directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.tasks.defaults()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.tasks.default_priority, 1);
        assert_eq!(cfg.tasks.default_status, "not_started");
        assert!(cfg.ui.notes_visible);
        assert!(cfg.ui.watch);
        assert!(cfg.mcp.reload_before_call);

        let defaults = cfg.tasks.defaults().expect("defaults");
        assert_eq!(defaults.priority, 1);
        assert_eq!(defaults.status, TaskStatus::NotStarted);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let content = r#"
[tasks]
default_priority = 2
default_status = "in_progress"

[ui]
notes_visible = false
watch = false

[mcp]
reload_before_call = false
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.tasks.default_priority, 2);
        assert_eq!(cfg.tasks.default_status, "in_progress");
        assert!(!cfg.ui.notes_visible);
        assert!(!cfg.ui.watch);
        assert!(!cfg.mcp.reload_before_call);
        assert_eq!(
            cfg.tasks.defaults().expect("defaults").status,
            TaskStatus::InProgress
        );
    }

    #[test]
    fn invalid_task_defaults_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[tasks]\ndefault_priority = 7\n").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }

        fs::write(&path, "[tasks]\ndefault_status = \"someday\"\n").expect("write config");
        assert!(matches!(
            Config::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_dir_defaults_when_missing_or_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.tasks.default_priority, 1);

        fs::write(dir.path().join("config.toml"), "[tasks\nbroken").expect("write config");
        let cfg = Config::load_from_dir(dir.path());
        assert!(cfg.ui.watch);
    }

    #[test]
    fn load_from_dir_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.toml"),
            "[ui]\nnotes_visible = false\n",
        )
        .expect("write config");

        let cfg = Config::load_from_dir(dir.path());
        assert!(!cfg.ui.notes_visible);
        assert!(cfg.ui.watch);
    }
}
