//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct that represents a single field job
//! with its checklist, its append-only audit log and the optional exception
//! request a technician can raise against it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::fields::*;
use crate::geo::Coordinate;

/// A unit of field work owned by exactly one technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: String,
    pub priority: Priority,
    pub status: Status,
    pub due: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Coordinate>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_request: Option<ExceptionRequest>,
    /// Bumped by the store on every committed write.
    #[serde(default)]
    pub version: u64,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// A checklist item. Purely informational; never gates a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// One line of a task's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub actor_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// A technician-raised request waiting on an admin decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRequest {
    #[serde(flatten)]
    pub kind: ExceptionKind,
    pub reason: String,
    pub status: ExceptionStatus,
    pub timestamp: DateTime<Utc>,
}

impl ExceptionRequest {
    pub fn is_pending(&self) -> bool {
        self.status == ExceptionStatus::Pending
    }
}

/// Fields an admin supplies when dispatching a new job.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub priority: Priority,
    pub due: NaiveDate,
    pub site: Option<Coordinate>,
    pub checklist: Vec<String>,
}

impl Task {
    /// Build a freshly dispatched task: `ToDo`, version 0, one "Dispatched" log line.
    pub fn dispatch(id: u64, new: NewTask, actor_id: &str, now: DateTime<Utc>) -> Self {
        // Blank lines in a dispatch checklist are skipped.
        let sub_tasks = new
            .checklist
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .zip(1..)
            .map(|(text, id)| SubTask {
                id,
                text: text.to_string(),
                completed: false,
            })
            .collect();
        let mut task = Task {
            id,
            title: new.title.trim().to_string(),
            description: new.description,
            assigned_to: new.assigned_to,
            priority: new.priority,
            status: Status::ToDo,
            due: new.due,
            site: new.site,
            sub_tasks,
            logs: Vec::new(),
            exception_request: None,
            version: 0,
            created_at_utc: now.timestamp(),
            updated_at_utc: now.timestamp(),
        };
        task.append_log(actor_id, "Dispatched", now);
        task
    }

    /// Append one audit entry. Entries are never edited or reordered.
    pub fn append_log(&mut self, actor_id: &str, action: impl Into<String>, at: DateTime<Utc>) -> &LogEntry {
        let id = self.logs.last().map(|l| l.id).unwrap_or(0) + 1;
        self.logs.push(LogEntry {
            id,
            actor_id: actor_id.to_string(),
            action: action.into(),
            timestamp: at,
        });
        self.updated_at_utc = at.timestamp();
        &self.logs[self.logs.len() - 1]
    }

    /// Add a checklist item at the end of the list. Not audited.
    pub fn add_checklist_item(&mut self, text: &str) -> Result<u64, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::EmptyField("checklist item"));
        }
        let id = self.sub_tasks.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        self.sub_tasks.push(SubTask {
            id,
            text: text.to_string(),
            completed: false,
        });
        Ok(id)
    }

    /// Flip a checklist item's completion flag and return the new value. Not audited.
    pub fn toggle_checklist_item(&mut self, item_id: u64) -> Result<bool, Rejection> {
        let task_id = self.id;
        let item = self
            .sub_tasks
            .iter_mut()
            .find(|s| s.id == item_id)
            .ok_or(Rejection::ChecklistItemNotFound { task_id, item_id })?;
        item.completed = !item.completed;
        Ok(item.completed)
    }

    /// Completed and total checklist counts.
    pub fn checklist_progress(&self) -> (usize, usize) {
        let done = self.sub_tasks.iter().filter(|s| s.completed).count();
        (done, self.sub_tasks.len())
    }

    pub fn pending_exception(&self) -> Option<&ExceptionRequest> {
        self.exception_request.as_ref().filter(|r| r.is_pending())
    }
}
