//! Notifications emitted when work changes hands.
//!
//! Delivery is fire-and-forget: a sink may drop, log or store what it gets,
//! and nothing upstream waits on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: &str, message: String, severity: Severity, task_id: u64, at: DateTime<Utc>) -> Self {
        Notification {
            title: title.to_string(),
            message,
            severity,
            task_id: Some(task_id),
            at,
        }
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, n: Notification) {
        match n.severity {
            Severity::Warning => warn!(task_id = ?n.task_id, title = %n.title, "{}", n.message),
            _ => info!(task_id = ?n.task_id, title = %n.title, "{}", n.message),
        }
    }
}

/// Keeps notifications in memory until they are taken.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub sent: Vec<Notification>,
}

impl MemorySink {
    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.sent)
    }
}

impl NotificationSink for MemorySink {
    fn notify(&mut self, n: Notification) {
        self.sent.push(n);
    }
}

/// Fan a notification out to two sinks.
impl<A: NotificationSink, B: NotificationSink> NotificationSink for (A, B) {
    fn notify(&mut self, n: Notification) {
        self.0.notify(n.clone());
        self.1.notify(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_delivers_to_both() {
        let mut sink = (MemorySink::default(), MemorySink::default());
        sink.notify(Notification::new("Job approved", "ok".into(), Severity::Success, 4, Utc::now()));
        assert_eq!(sink.0.sent.len(), 1);
        assert_eq!(sink.1.sent.len(), 1);
        assert_eq!(sink.1.take().len(), 1);
        assert!(sink.1.sent.is_empty());
    }
}
