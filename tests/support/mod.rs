#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory for one test
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.file(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_json(&self, name: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.file(name))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The binary pointed at this data directory, with logging off
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tasktracker").expect("binary");
        cmd.arg("--data-dir")
            .arg(self.path())
            .env_remove("TASKTRACKER_HOME")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json` and return the parsed success envelope
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().arg("--json").args(args).output()?;
        if !output.status.success() {
            return Err(format!(
                "command {args:?} failed: {}",
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        let envelope: Value = serde_json::from_slice(&output.stdout)?;
        Ok(envelope)
    }
}

/// Add a task through the CLI and return its id
pub fn add_task(home: &TestHome, title: &str) -> Result<String, Box<dyn std::error::Error>> {
    let envelope = home.json(&["task", "add", title])?;
    let id = envelope["data"]["id"].as_str().ok_or("missing id")?;
    Ok(id.to_string())
}

/// Add a plan step through the CLI and return its id
pub fn add_step(home: &TestHome, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let envelope = home.json(&["plan", "add", name])?;
    let id = envelope["data"]["id"].as_str().ok_or("missing id")?;
    Ok(id.to_string())
}

pub fn step_names(home: &TestHome) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let envelope = home.json(&["plan", "list"])?;
    let steps = envelope["data"]["steps"].as_array().ok_or("missing steps")?;
    Ok(steps
        .iter()
        .filter_map(|step| step["name"].as_str().map(str::to_string))
        .collect())
}
