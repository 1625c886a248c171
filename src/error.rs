//! Error types for rtsync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown ticket, rejected self link)
//! - 4: Operation failed (transport, remote status, partial link write,
//!   mirror left behind the remote)
//!
//! Decoders never produce errors. A response that does not match the
//! expected shape decodes to an empty result, and callers decide what
//! absence means.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the rtsync CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for rtsync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Refusing to link ticket {0} to itself")]
    SelfLink(String),

    // Operation failures (exit code 4)
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned {code}: {message}")]
    Remote { code: u16, message: String },

    #[error("Link write left tickets out of sync (written: {written:?}, failed: {failed:?}): {message}")]
    SyncInconsistency {
        written: Vec<String>,
        failed: Vec<String>,
        message: String,
    },

    #[error("Remote links written for {written:?} but the mirror was not updated: {message}")]
    MirrorNotUpdated {
        written: Vec<String>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TicketNotFound(_)
            | Error::SelfLink(_) => exit_codes::USER_ERROR,

            Error::Transport(_)
            | Error::Http(_)
            | Error::Remote { .. }
            | Error::SyncInconsistency { .. }
            | Error::MirrorNotUpdated { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for machine-readable error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::TicketNotFound(id) | Error::SelfLink(id) => {
                Some(serde_json::json!({ "ticket": id }))
            }
            Error::Remote { code, message } => {
                Some(serde_json::json!({ "code": code, "message": message }))
            }
            Error::SyncInconsistency {
                written,
                failed,
                message,
            } => Some(serde_json::json!({
                "written": written,
                "failed": failed,
                "message": message,
            })),
            Error::MirrorNotUpdated { written, message } => Some(serde_json::json!({
                "written": written,
                "message": message,
            })),
            Error::LockFailed(path) => {
                Some(serde_json::json!({ "path": path.to_string_lossy() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for rtsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
