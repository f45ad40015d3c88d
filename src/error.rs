//! Error types for tasktracker
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad arguments, invalid fields, bad import document)
//! - 3: Record not found
//! - 4: Operation failed (persistence, terminal, protocol)

use std::path::PathBuf;
use thiserror::Error;

use crate::record::RecordKind;

/// Exit codes for the tasktracker CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tracker operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Missing records (exit code 3)
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    // Operation failures (exit code 4)
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::NotFound { .. } => exit_codes::NOT_FOUND,

            Error::Persistence { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Short machine-readable code used by the MCP tool envelope
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::InvalidConfig(_) => "VALIDATION",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Persistence { .. } => "PERSISTENCE",
            _ => "FAILED",
        }
    }

    /// Structured context attached to JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { kind, id } => Some(serde_json::json!({
                "kind": kind.as_str(),
                "id": id,
            })),
            Error::Persistence { path, .. } => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            _ => None,
        }
    }

    pub(crate) fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the CLI's JSON error envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        let kind = match err.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::NOT_FOUND => "not_found",
            _ => "operation_failed",
        };
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind,
            details: err.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(
            Error::Validation("bad".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::not_found(RecordKind::Task, "abc").exit_code(),
            exit_codes::NOT_FOUND
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            Error::persistence("/tmp/tasks.json", io).exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }

    #[test]
    fn not_found_renders_kind_and_id() {
        let err = Error::not_found(RecordKind::PlanStep, "s-1");
        assert_eq!(err.to_string(), "Plan step not found: s-1");
        let json = JsonError::from(&err);
        assert_eq!(json.code, 3);
        assert_eq!(json.kind, "not_found");
        assert_eq!(
            json.details,
            Some(serde_json::json!({"kind": "plan_step", "id": "s-1"}))
        );
    }
}
