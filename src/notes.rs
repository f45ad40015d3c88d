//! Free-form notes kept in `notes.txt`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage;

#[derive(Debug, Clone)]
pub struct NotesStore {
    path: PathBuf,
    text: String,
}

impl NotesStore {
    /// Load notes; a missing or unreadable file reads as empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let text = load_text(&path);
        Self { path, text }
    }

    pub fn get(&self) -> &str {
        &self.text
    }

    /// Overwrite the notes and persist them
    pub fn save(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        storage::write_atomic(&self.path, text.as_bytes())?;
        tracing::info!(chars = text.chars().count(), "notes saved");
        self.text = text;
        Ok(())
    }

    /// Write the current text back to disk
    pub fn flush(&self) -> Result<()> {
        storage::write_atomic(&self.path, self.text.as_bytes())
    }

    pub fn reload(&mut self) {
        self.text = load_text(&self.path);
    }
}

fn load_text(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable notes file, starting empty");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_notes_read_as_empty() {
        let temp = TempDir::new().unwrap();
        let notes = NotesStore::open(temp.path().join("notes.txt"));
        assert_eq!(notes.get(), "");
    }

    #[test]
    fn save_overwrites_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        let mut notes = NotesStore::open(&path);

        notes.save("first draft").unwrap();
        notes.save("line one\nline two").unwrap();
        assert_eq!(notes.get(), "line one\nline two");

        let reopened = NotesStore::open(&path);
        assert_eq!(reopened.get(), "line one\nline two");
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        let mut notes = NotesStore::open(&path);
        notes.save("mine").unwrap();

        fs::write(&path, "theirs").unwrap();
        notes.reload();
        assert_eq!(notes.get(), "theirs");
    }

    #[test]
    fn failed_save_keeps_previous_text() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file").unwrap();
        let mut notes = NotesStore::open(blocker.join("notes.txt"));

        assert!(notes.save("lost").is_err());
        assert_eq!(notes.get(), "");
    }
}
