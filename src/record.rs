//! Shared record plumbing: record kinds, ids and timestamps.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// The kinds of record a store can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Task,
    PlanStep,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Task => "task",
            RecordKind::PlanStep => "plan_step",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Task => write!(f, "Task"),
            RecordKind::PlanStep => write!(f, "Plan step"),
        }
    }
}

/// A persisted record with a stable identifier.
///
/// `validate` checks the field-level invariants that must hold for any
/// record accepted into a store, whether it came from a façade or an import.
pub trait Record: Clone + Serialize + DeserializeOwned {
    const KIND: RecordKind;

    fn id(&self) -> &str;

    fn validate(&self) -> Result<()>;
}

/// Generate a fresh record identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Timestamp for a mutation that must sort strictly after `previous`.
///
/// The wall clock can repeat (or step backwards) between two fast writes,
/// so the result is bumped one microsecond past `previous` when needed.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Reject a record whose last update predates its creation
pub(crate) fn check_timestamps(
    kind: RecordKind,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    if updated_at < created_at {
        return Err(Error::Validation(format!(
            "{} updated_at {} is earlier than created_at {}",
            kind.as_str(),
            updated_at.to_rfc3339(),
            created_at.to_rfc3339()
        )));
    }
    Ok(())
}

/// Deserialize a timestamp written either as RFC 3339 or as a naive
/// ISO-8601 datetime (no offset, read as UTC).
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(value.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(value.and_utc());
        }
    }
    Err(format!("invalid timestamp '{raw}'"))
}
