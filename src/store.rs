//! Generic persisted collection of records.
//!
//! An [`EntityStore`] keeps one kind of record in memory, in insertion
//! order, and mirrors it to a JSON array file. Every mutation saves the
//! whole collection before returning; if the mutation or the save fails the
//! in-memory collection is restored, so callers never observe a partially
//! applied change.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::{Record, RecordKind};
use crate::storage;

#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    path: PathBuf,
    records: Vec<T>,
}

impl<T: Record> EntityStore<T> {
    /// Load the collection at `path`.
    ///
    /// Never fails: a missing file is an empty collection, and an unreadable
    /// or malformed file degrades to empty with a warning. Individual bad
    /// entries are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records::<T>(&path);
        Self { path, records }
    }

    /// Re-read the backing file, discarding in-memory state
    pub fn reload(&mut self) {
        self.records = load_records::<T>(&self.path);
    }

    pub fn save(&self) -> Result<()> {
        storage::write_json(&self.path, &self.records)
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn get(&self, id: &str) -> Result<&T> {
        self.find(id).ok_or_else(|| Error::not_found(T::KIND, id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn list<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.records
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Append a record and persist
    pub fn add(&mut self, record: T) -> Result<T> {
        record.validate()?;
        if self.contains(record.id()) {
            return Err(Error::Validation(format!(
                "duplicate {} id '{}'",
                T::KIND.as_str(),
                record.id()
            )));
        }
        self.transact(|records| {
            records.push(record.clone());
            Ok(record)
        })
    }

    /// Apply `mutator` to the record with `id`, re-validate it and persist
    pub fn update<F>(&mut self, id: &str, mutator: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        self.transact(|records| {
            let record = records
                .iter_mut()
                .find(|record| record.id() == id)
                .ok_or_else(|| Error::not_found(T::KIND, id))?;
            mutator(record)?;
            record.validate()?;
            Ok(record.clone())
        })
    }

    /// Remove the record with `id` and persist; returns the removed record
    pub fn delete(&mut self, id: &str) -> Result<T> {
        self.transact(|records| {
            let index = records
                .iter()
                .position(|record| record.id() == id)
                .ok_or_else(|| Error::not_found(T::KIND, id))?;
            Ok(records.remove(index))
        })
    }

    /// Replace the whole collection and persist
    pub fn replace_all(&mut self, records: Vec<T>) -> Result<()> {
        self.transact(|current| {
            *current = records;
            Ok(())
        })
    }

    /// Run `f` against the collection and persist the result.
    ///
    /// If `f` or the save fails, the collection is rolled back.
    pub fn transact<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let snapshot = self.records.clone();
        let outcome = f(&mut self.records);
        let outcome = match outcome {
            Ok(value) => self.save().map(|()| value),
            Err(err) => Err(err),
        };
        if outcome.is_err() {
            self.records = snapshot;
        }
        outcome
    }

    /// Adjust the in-memory collection without persisting.
    ///
    /// Used for load-time normalization; the change reaches disk with the
    /// next mutation.
    pub(crate) fn normalize<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Vec<T>),
    {
        f(&mut self.records);
    }
}

fn load_records<T: Record>(path: &Path) -> Vec<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no data file yet");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable data file, starting empty");
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    let value: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt data file, starting empty");
            return Vec::new();
        }
    };

    let Some(items) = collection_items(value, T::KIND) else {
        tracing::warn!(path = %path.display(), "data file is not a list, starting empty");
        return Vec::new();
    };

    let mut records = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(record) => {
                if !seen.insert(record.id().to_string()) {
                    tracing::warn!(
                        path = %path.display(),
                        id = record.id(),
                        "skipping duplicate {}",
                        T::KIND.as_str()
                    );
                    continue;
                }
                records.push(record);
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    index,
                    error = %err,
                    "skipping malformed {}",
                    T::KIND.as_str()
                );
            }
        }
    }

    tracing::debug!(path = %path.display(), count = records.len(), "loaded records");
    records
}

/// Accept a bare array, or the older `{"steps": [...]}` / `{"tasks": [...]}` wrapper
fn collection_items(value: Value, kind: RecordKind) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => {
            let key = match kind {
                RecordKind::Task => "tasks",
                RecordKind::PlanStep => "steps",
            };
            match map.remove(key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }
        }
        _ => None,
    }
}
