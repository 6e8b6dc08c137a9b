//! Enumerations and field types for field tasks.
//!
//! This module defines the structured values a task carries (priority, status,
//! exception kind) along with the work-mode classification of employees and the
//! sorting options offered by the CLI.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for a field job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
}

/// Workflow status of a task. `Done` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[serde(alias = "ToDo", alias = "todo")]
    ToDo,
    #[serde(alias = "InProgress")]
    InProgress,
    #[serde(alias = "Review")]
    Review,
    #[serde(alias = "Done")]
    Done,
}

impl Status {
    /// All statuses in board order.
    pub const ALL: [Status; 4] = [Status::ToDo, Status::InProgress, Status::Review, Status::Done];

    pub fn is_terminal(self) -> bool {
        self == Status::Done
    }

    /// Column index on the task board.
    pub fn column(self) -> usize {
        match self {
            Status::ToDo => 0,
            Status::InProgress => 1,
            Status::Review => 2,
            Status::Done => 3,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Done => "Done",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        f.write_str(s)
    }
}

/// How an employee works: on customer sites or from the office.
///
/// Field staff are subject to the geofence guard when submitting work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkMode {
    Field,
    Office,
}

/// The kind of side-channel request a technician can raise on a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExceptionKind {
    /// Ask an admin to move the due date.
    Move,
}

/// Resolution state of an exception request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExceptionStatus {
    Pending,
    Resolved,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Due,
    Priority,
    Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_legacy_spellings() {
        let s: Status = serde_json::from_str("\"InProgress\"").unwrap();
        assert_eq!(s, Status::InProgress);
        let s: Status = serde_json::from_str("\"to-do\"").unwrap();
        assert_eq!(s, Status::ToDo);
        let s: Status = serde_json::from_str("\"ToDo\"").unwrap();
        assert_eq!(s, Status::ToDo);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(serde_json::from_str::<Status>("\"archived\"").is_err());
    }

    #[test]
    fn only_done_is_terminal() {
        for s in Status::ALL {
            assert_eq!(s.is_terminal(), s == Status::Done);
        }
    }

    #[test]
    fn exception_kind_is_tagged() {
        let json = serde_json::to_string(&ExceptionKind::Move).unwrap();
        assert_eq!(json, r#"{"type":"move"}"#);
    }
}
