//! Error types for tidepool.
//!
//! Two layers: `TaskError` is what handlers and core helpers raise, `AgentError` is
//! the closed taxonomy the Dispatcher hands back to callers. Every `TaskError` is
//! folded into exactly one `AgentError` kind at the dispatch boundary.

use crate::core::sandbox::PathViolation;
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("HTTP transport error: {0}")]
    TransportError(#[from] reqwest::Error),
    #[error(transparent)]
    PathViolation(#[from] PathViolation),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Remote call failed: {0}")]
    RemoteError(String),
    #[error("Capability denied: {0}")]
    CapabilityDenied(String),
    #[error("Command failed: {0}")]
    CommandFailed(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Coarse failure class, used for HTTP-style status codes and CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    ClientInput,
    NotFound,
    DependencyFailure,
    Internal,
}

impl ErrorClass {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorClass::ClientInput => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::DependencyFailure => 502,
            ErrorClass::Internal => 500,
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            ErrorClass::Internal => 1,
            ErrorClass::ClientInput => 2,
            ErrorClass::NotFound => 3,
            ErrorClass::DependencyFailure => 4,
        }
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unrecognized or unsupported task description")]
    UnrecognizedTask,
    #[error("Could not extract parameters for {operation_id}: {reason}")]
    ExtractionError {
        operation_id: String,
        reason: String,
    },
    #[error("{0}")]
    PathViolation(String),
    #[error("Not found: {0}")]
    MissingResource(String),
    #[error("Remote call failed during {operation_id}: {cause}")]
    RemoteCallFailed { operation_id: String, cause: String },
    #[error("Operation {operation_id} failed: {cause}")]
    OperationFailed { operation_id: String, cause: String },
    /// The cause is kept for logs; `Display` stays generic.
    #[error("Internal error")]
    InternalError { cause: String },
}

impl AgentError {
    /// Stable machine-readable kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::UnrecognizedTask => "unrecognized_task",
            AgentError::ExtractionError { .. } => "extraction_error",
            AgentError::PathViolation(_) => "path_violation",
            AgentError::MissingResource(_) => "missing_resource",
            AgentError::RemoteCallFailed { .. } => "remote_call_failed",
            AgentError::OperationFailed { .. } => "operation_failed",
            AgentError::InternalError { .. } => "internal_error",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AgentError::UnrecognizedTask
            | AgentError::ExtractionError { .. }
            | AgentError::PathViolation(_) => ErrorClass::ClientInput,
            AgentError::MissingResource(_) => ErrorClass::NotFound,
            AgentError::RemoteCallFailed { .. } => ErrorClass::DependencyFailure,
            AgentError::OperationFailed { .. } | AgentError::InternalError { .. } => {
                ErrorClass::Internal
            }
        }
    }

    /// Fold a handler failure into the public taxonomy, keeping the most specific kind.
    pub fn from_task(operation_id: &str, err: TaskError) -> Self {
        match err {
            TaskError::PathViolation(v) => AgentError::PathViolation(v.to_string()),
            TaskError::NotFound(what) => AgentError::MissingResource(what),
            TaskError::RemoteError(cause) => AgentError::RemoteCallFailed {
                operation_id: operation_id.to_string(),
                cause,
            },
            TaskError::TransportError(e) => AgentError::RemoteCallFailed {
                operation_id: operation_id.to_string(),
                cause: e.to_string(),
            },
            TaskError::IoError(e) if e.kind() == io::ErrorKind::NotFound => {
                AgentError::MissingResource(e.to_string())
            }
            other => AgentError::OperationFailed {
                operation_id: operation_id.to_string(),
                cause: other.to_string(),
            },
        }
    }
}

impl From<PathViolation> for AgentError {
    fn from(v: PathViolation) -> Self {
        AgentError::PathViolation(v.to_string())
    }
}
