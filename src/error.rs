//! Error types.
//!
//! Business-rule refusals are [`Rejection`]s: they never mutate anything and
//! their message tells the actor what to do instead. Everything else (disk,
//! parsing, concurrent edits) is an [`Error`].

use std::path::PathBuf;

use thiserror::Error;

use crate::fields::Status;

/// A command refused by the workflow rules. State is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("only the assigned technician ({owner}) can {action} task #{task_id}")]
    NotOwner {
        task_id: u64,
        owner: String,
        action: &'static str,
    },

    #[error("only an admin can {action}")]
    NotAdmin { action: &'static str },

    #[error("cannot {action} task #{task_id} while it is {status}")]
    WrongState {
        task_id: u64,
        action: &'static str,
        status: Status,
    },

    #[error("task #{task_id} is already done")]
    AlreadyDone { task_id: u64 },

    #[error("must be within {limit_km:.1} km of the site to submit (currently {distance_km:.1} km away)")]
    OutsideGeofence { distance_km: f64, limit_km: f64 },

    #[error("a reason is required to request a date move")]
    MissingReason,

    #[error("task #{task_id} already has a pending date-move request")]
    ExceptionPending { task_id: u64 },

    #[error("task #{task_id} has no pending request to resolve")]
    NoPendingException { task_id: u64 },

    #[error("force finish must be explicitly confirmed")]
    ConfirmationRequired,

    #[error("checklist item {item_id} not found on task #{task_id}")]
    ChecklistItemNotFound { task_id: u64, item_id: u64 },

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("task #{task_id} is not visible to {actor}")]
    NotVisible { task_id: u64, actor: String },
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("task #{0} not found")]
    TaskNotFound(u64),

    #[error("task #{id} was changed by someone else (expected version {expected}, found {found}); reload and retry")]
    Conflict { id: u64, expected: u64, found: u64 },

    #[error("task #{0} already exists")]
    DuplicateTask(u64),

    #[error("unknown employee '{0}'")]
    UnknownEmployee(String),

    #[error("no user given; pass --as <employee-id> or set FIELDOPS_USER")]
    NoUser,

    #[error("employee '{0}' already exists")]
    DuplicateEmployee(String),

    #[error("no task matches '{0}'")]
    NoMatch(String),

    #[error("'{0}' matches several tasks; use the numeric id instead")]
    Ambiguous(String),

    #[error("could not understand date '{0}' (try YYYY-MM-DD, today, tomorrow or 'in 3d')")]
    BadDate(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid database {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    /// The rejection behind this error, if it was a business-rule refusal.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Error::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
